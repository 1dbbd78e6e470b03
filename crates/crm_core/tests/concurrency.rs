mod common;

use common::{account_request, Fixture};
use crm_core::{
    BankAccountRepository, Cancellation, LegalEntityRepository, NewLegalEntity, RepoError, Store,
    StoreConfig,
};
use std::thread;
use std::time::Duration;

const WRITERS: usize = 8;

fn file_fixture(dir: &tempfile::TempDir) -> Fixture {
    let mut config = StoreConfig::file(dir.path().join("crm.db"));
    config.max_connections = 4;
    Fixture::on(Store::open(config).unwrap())
}

#[test]
fn racing_creates_on_same_name_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let fx = file_fixture(&dir);

    let results = thread::scope(|scope| {
        let handles = (0..WRITERS)
            .map(|_| {
                scope.spawn(|| {
                    fx.entities
                        .create(&Cancellation::new(), &NewLegalEntity::new("Acme Corp"))
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });

    let created = results.iter().filter(|result| result.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|result| matches!(result, Err(RepoError::Conflict { .. })))
        .count();
    assert_eq!(created, 1);
    assert_eq!(conflicts, WRITERS - 1);
    assert_eq!(fx.entities.get_all(&fx.cancel).unwrap().len(), 1);
}

#[test]
fn racing_primary_creates_leave_one_primary() {
    let dir = tempfile::tempdir().unwrap();
    let fx = file_fixture(&dir);
    let entity = fx.entity("Acme Corp");

    thread::scope(|scope| {
        for _ in 0..WRITERS {
            scope.spawn(|| {
                fx.accounts
                    .create(&Cancellation::new(), &account_request(entity.id, true))
                    .unwrap();
            });
        }
    });

    let accounts = fx.accounts.get_all(&fx.cancel).unwrap();
    assert_eq!(accounts.len(), WRITERS);
    assert_eq!(fx.primaries_of(entity.id).len(), 1);
}

#[test]
fn readers_never_observe_two_primaries() {
    let dir = tempfile::tempdir().unwrap();
    let fx = file_fixture(&dir);
    let entity = fx.entity("Acme Corp");
    fx.account(entity.id, true);

    thread::scope(|scope| {
        let writer = scope.spawn(|| {
            for _ in 0..20 {
                fx.accounts
                    .create(&Cancellation::new(), &account_request(entity.id, true))
                    .unwrap();
            }
        });

        let reader = scope.spawn(|| {
            for _ in 0..50 {
                let composed = fx
                    .accounts
                    .get_entity_with_accounts(&Cancellation::new(), entity.id)
                    .unwrap();
                let primaries = composed
                    .bank_accounts
                    .iter()
                    .filter(|account| account.is_primary)
                    .count();
                assert_eq!(primaries, 1);
            }
        });

        writer.join().unwrap();
        reader.join().unwrap();
    });
}

#[test]
fn canceled_call_writes_nothing() {
    let fx = Fixture::in_memory();
    let cancel = Cancellation::new();
    cancel.cancel();

    let err = fx
        .entities
        .create(&cancel, &NewLegalEntity::new("Acme Corp"))
        .unwrap_err();
    assert!(matches!(err, RepoError::Canceled));
    assert!(fx.entities.get_all(&fx.cancel).unwrap().is_empty());
}

#[test]
fn elapsed_deadline_surfaces_canceled_on_reads() {
    let fx = Fixture::in_memory();
    fx.entity("Acme Corp");

    let expired = Cancellation::with_timeout(Duration::ZERO);
    let err = fx.entities.get_all(&expired).unwrap_err();
    assert!(matches!(err, RepoError::Canceled));

    let err = fx.accounts.get_all(&expired).unwrap_err();
    assert_eq!(err.kind(), crm_core::ErrorKind::Canceled);
}

#[test]
fn cancellation_while_waiting_for_connection() {
    let fx = Fixture::in_memory();
    let held = fx.store.checkout(&fx.cancel).unwrap();

    let waiting = Cancellation::with_timeout(Duration::from_millis(50));
    let err = fx.entities.get_all(&waiting).unwrap_err();
    assert!(matches!(err, RepoError::Canceled));

    drop(held);
    assert!(fx.entities.get_all(&fx.cancel).unwrap().is_empty());
}

#[test]
fn in_flight_statement_is_interrupted() {
    let fx = Fixture::in_memory();
    let cancel = Cancellation::new();
    let conn = fx.store.checkout(&cancel).unwrap();

    let trigger = cancel.clone();
    let result = thread::scope(|scope| {
        scope.spawn(move || {
            thread::sleep(Duration::from_millis(50));
            trigger.cancel();
        });
        conn.query_row(
            "WITH RECURSIVE counter(n) AS (
                SELECT 1
                UNION ALL
                SELECT n + 1 FROM counter
            )
            SELECT COUNT(*) FROM counter;",
            [],
            |row| row.get::<_, i64>(0),
        )
    });

    let err = RepoError::from(result.unwrap_err());
    assert!(matches!(err, RepoError::Canceled));
}

mod common;

use common::account_request;
use crm_core::{
    AccountDefaults, BankAccountPatch, CallContext, Cancellation, ErrorKind, NewLegalEntity,
    Principal, RepoError, SqliteRegistryService, Store,
};

fn service() -> SqliteRegistryService {
    SqliteRegistryService::sqlite(Store::open_in_memory().unwrap(), AccountDefaults::default())
}

fn ctx() -> CallContext {
    CallContext::new(Principal::new("ops@registry").unwrap())
}

#[test]
fn acme_primary_account_handover() {
    let service = service();
    let ctx = ctx();

    let acme = service
        .create_legal_entity(&ctx, &NewLegalEntity::new("Acme Corp"))
        .unwrap();
    assert_eq!(acme.created_at, acme.updated_at);
    assert!(acme.bank_accounts.is_empty());

    let first = service
        .create_bank_account(&ctx, &account_request(acme.id, true))
        .unwrap();
    let composed = service.get_legal_entity_with_accounts(&ctx, acme.id).unwrap();
    assert_eq!(composed.primary_account().map(|account| account.id), Some(first.id));

    let second = service
        .create_bank_account(&ctx, &account_request(acme.id, true))
        .unwrap();
    assert!(second.is_primary);

    let first_now = service.get_bank_account(&ctx, first.id).unwrap();
    assert!(!first_now.is_primary);

    let composed = service.get_legal_entity_with_accounts(&ctx, acme.id).unwrap();
    assert_eq!(composed.bank_accounts.len(), 2);
    assert_eq!(composed.primary_account().map(|account| account.id), Some(second.id));
}

#[test]
fn entity_lifecycle_through_service() {
    let service = service();
    let ctx = ctx();

    let entity = service
        .create_legal_entity(&ctx, &NewLegalEntity::new("Acme Corp"))
        .unwrap();
    let renamed = service
        .update_legal_entity_name(&ctx, entity.id, "Acme Holding")
        .unwrap();
    assert_eq!(renamed.name, "Acme Holding");
    assert!(renamed.updated_at >= renamed.created_at);

    let fetched = service.get_legal_entity(&ctx, entity.id).unwrap();
    assert_eq!(fetched.name, "Acme Holding");
    assert_eq!(service.list_legal_entities(&ctx).unwrap().len(), 1);

    service.delete_legal_entity(&ctx, entity.id).unwrap();
    let err = service.get_legal_entity(&ctx, entity.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(service.list_legal_entities(&ctx).unwrap().is_empty());

    service
        .create_legal_entity(&ctx, &NewLegalEntity::new("Acme Holding"))
        .unwrap();
}

#[test]
fn account_lifecycle_through_service() {
    let service = service();
    let ctx = ctx();
    let entity = service
        .create_legal_entity(&ctx, &NewLegalEntity::new("Acme Corp"))
        .unwrap();

    let account = service
        .create_bank_account(&ctx, &account_request(entity.id, false))
        .unwrap();
    let patch = BankAccountPatch {
        comment: Some("Payroll".to_string()),
        is_primary: Some(true),
        ..BankAccountPatch::default()
    };
    let updated = service.update_bank_account(&ctx, account.id, &patch).unwrap();
    assert_eq!(updated.comment, "Payroll");
    assert!(updated.is_primary);
    assert_eq!(updated.bic, account.bic);

    assert_eq!(service.list_bank_accounts(&ctx).unwrap().len(), 1);
    service.delete_bank_account(&ctx, account.id).unwrap();
    assert!(service.list_bank_accounts(&ctx).unwrap().is_empty());

    let err = service.delete_bank_account(&ctx, account.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn service_surfaces_repository_errors_unchanged() {
    let service = service();
    let ctx = ctx();
    service
        .create_legal_entity(&ctx, &NewLegalEntity::new("Acme Corp"))
        .unwrap();

    let err = service
        .create_legal_entity(&ctx, &NewLegalEntity::new("Acme Corp"))
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict { ref name } if name == "Acme Corp"));

    let err = service
        .create_legal_entity(&ctx, &NewLegalEntity::new(""))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn canceled_context_is_honoured() {
    let service = service();
    let cancel = Cancellation::new();
    let ctx = CallContext::with_cancellation(Principal::new("ops").unwrap(), cancel.clone());
    cancel.cancel();

    let err = service
        .create_legal_entity(&ctx, &NewLegalEntity::new("Acme Corp"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Canceled);
    assert!(service.list_legal_entities(&self::ctx()).unwrap().is_empty());
}

#[test]
fn configured_default_currency_applies() {
    let defaults = AccountDefaults {
        currency: "USD".to_string(),
        ..AccountDefaults::default()
    };
    let service = SqliteRegistryService::sqlite(Store::open_in_memory().unwrap(), defaults);
    let ctx = ctx();
    let entity = service
        .create_legal_entity(&ctx, &NewLegalEntity::new("Acme Corp"))
        .unwrap();

    let mut request = account_request(entity.id, false);
    request.currency = None;
    request.comment = None;
    let account = service.create_bank_account(&ctx, &request).unwrap();
    assert_eq!(account.currency, "USD");
    assert_eq!(account.comment, "No comment");
}

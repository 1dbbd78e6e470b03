#![allow(dead_code)]

use crm_core::{
    BankAccount, BankAccountRepository, Cancellation, LegalEntity, LegalEntityId,
    LegalEntityRepository, NewBankAccount, NewLegalEntity, SqliteBankAccountRepository,
    SqliteLegalEntityRepository, Store,
};

pub struct Fixture {
    pub store: Store,
    pub entities: SqliteLegalEntityRepository,
    pub accounts: SqliteBankAccountRepository,
    pub cancel: Cancellation,
}

impl Fixture {
    pub fn in_memory() -> Self {
        Self::on(Store::open_in_memory().unwrap())
    }

    pub fn on(store: Store) -> Self {
        Self {
            entities: SqliteLegalEntityRepository::new(store.clone()),
            accounts: SqliteBankAccountRepository::new(store.clone()),
            store,
            cancel: Cancellation::new(),
        }
    }

    pub fn entity(&self, name: &str) -> LegalEntity {
        self.entities
            .create(&self.cancel, &NewLegalEntity::new(name))
            .unwrap()
    }

    pub fn account(&self, entity_id: LegalEntityId, primary: bool) -> BankAccount {
        self.accounts
            .create(&self.cancel, &account_request(entity_id, primary))
            .unwrap()
    }

    pub fn primaries_of(&self, entity_id: LegalEntityId) -> Vec<BankAccount> {
        self.accounts
            .get_all(&self.cancel)
            .unwrap()
            .into_iter()
            .filter(|account| account.legal_entity_id == entity_id && account.is_primary)
            .collect()
    }
}

pub fn account_request(entity_id: LegalEntityId, primary: bool) -> NewBankAccount {
    NewBankAccount {
        legal_entity_id: entity_id,
        bic: "044525225".to_string(),
        bank_name: "Sberbank".to_string(),
        bank_address: Some("Moscow, Vavilova 19".to_string()),
        correspondent_account: "30101810000000000225".to_string(),
        payment_account: "40702810000000000001".to_string(),
        currency: Some("RUB".to_string()),
        is_primary: primary,
        ..NewBankAccount::default()
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory chain used by tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::U256;
use async_trait::async_trait;

use super::address::TronAddress;
use super::client::{ChainError, ChainReader, ChainResult};
use super::trc20::TRANSFER_TOPIC;
use super::types::{
    AccountInfo, Contract, ContractParameter, ContractRet, ContractValue, EventLog, RawData,
    RawTransaction, Receipt, TransactionInfo,
};

#[derive(Default)]
pub struct MockChain {
    transactions: Mutex<HashMap<String, RawTransaction>>,
    infos: Mutex<HashMap<String, TransactionInfo>>,
    accounts: Mutex<HashMap<TronAddress, AccountInfo>>,
    token_balances: Mutex<HashMap<(TronAddress, TronAddress), U256>>,
    head_block: Mutex<u64>,
    fail_with: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of node calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_head_block(&self, block: u64) {
        *self.head_block.lock().unwrap() = block;
    }

    /// Make every call fail with a transport error.
    pub fn fail_all(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn insert_transaction(&self, tx: RawTransaction, info: Option<TransactionInfo>) {
        let key = tx.tx_id.to_lowercase();
        if let Some(info) = info {
            self.infos.lock().unwrap().insert(key.clone(), info);
        }
        self.transactions.lock().unwrap().insert(key, tx);
    }

    pub fn insert_account(&self, address: TronAddress, balance_sun: u64) {
        self.accounts.lock().unwrap().insert(
            address,
            AccountInfo {
                address: Some(address.to_hex()),
                balance: balance_sun,
                create_time: Some(1_700_000_000_000),
            },
        );
    }

    pub fn insert_token_balance(&self, contract: TronAddress, owner: TronAddress, units: u64) {
        self.token_balances
            .lock()
            .unwrap()
            .insert((contract, owner), U256::from(units));
    }

    /// Register a successful native TRX transfer.
    pub fn add_trx_transfer(
        &self,
        tx_hash: &str,
        from: &TronAddress,
        to: &TronAddress,
        amount_sun: u64,
        block: Option<u64>,
    ) {
        let tx = raw_transaction(
            tx_hash,
            "SUCCESS",
            "TransferContract",
            ContractValue {
                owner_address: Some(from.to_hex()),
                to_address: Some(to.to_hex()),
                amount: Some(amount_sun),
                ..Default::default()
            },
        );
        let info = TransactionInfo {
            id: tx_hash.to_string(),
            block_number: block,
            block_timestamp: block.map(|_| 1_700_000_000_000),
            ..Default::default()
        };
        self.insert_transaction(tx, Some(info));
    }

    /// Register a successful TRC20 `transfer` call with the given logs.
    pub fn add_trc20_call(
        &self,
        tx_hash: &str,
        caller: &TronAddress,
        contract: &TronAddress,
        logs: Vec<EventLog>,
        block: Option<u64>,
    ) {
        let tx = raw_transaction(
            tx_hash,
            "SUCCESS",
            "TriggerSmartContract",
            ContractValue {
                owner_address: Some(caller.to_hex()),
                contract_address: Some(contract.to_hex()),
                data: Some("a9059cbb".to_string()),
                ..Default::default()
            },
        );
        let info = TransactionInfo {
            id: tx_hash.to_string(),
            block_number: block,
            block_timestamp: block.map(|_| 1_700_000_000_000),
            receipt: Some(Receipt {
                result: Some("SUCCESS".to_string()),
            }),
            log: logs,
            result: None,
        };
        self.insert_transaction(tx, Some(info));
    }

    fn enter(&self) -> ChainResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with.lock().unwrap().as_ref() {
            Some(msg) => Err(ChainError::Transport(msg.clone())),
            None => Ok(()),
        }
    }
}

pub fn raw_transaction(
    tx_hash: &str,
    contract_ret: &str,
    contract_type: &str,
    value: ContractValue,
) -> RawTransaction {
    RawTransaction {
        tx_id: tx_hash.to_string(),
        ret: vec![ContractRet {
            contract_ret: Some(contract_ret.to_string()),
        }],
        raw_data: Some(RawData {
            contract: vec![Contract {
                contract_type: contract_type.to_string(),
                parameter: ContractParameter { value },
            }],
            timestamp: Some(1_700_000_000_000),
        }),
    }
}

/// An unrelated event log (Approval-like) to mix into receipts.
pub fn unrelated_log(contract: &TronAddress) -> EventLog {
    let mut topic = TRANSFER_TOPIC.0;
    topic[0] ^= 0xff;
    EventLog {
        address: alloy::hex::encode(contract.evm_bytes()),
        topics: vec![alloy::hex::encode(topic), "00".repeat(32), "00".repeat(32)],
        data: "00".repeat(32),
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn get_transaction(&self, tx_hash: &str) -> ChainResult<Option<RawTransaction>> {
        self.enter()?;
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .get(&tx_hash.to_lowercase())
            .cloned())
    }

    async fn get_transaction_info(&self, tx_hash: &str) -> ChainResult<Option<TransactionInfo>> {
        self.enter()?;
        Ok(self.infos.lock().unwrap().get(&tx_hash.to_lowercase()).cloned())
    }

    async fn get_account(&self, address: &TronAddress) -> ChainResult<Option<AccountInfo>> {
        self.enter()?;
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn trc20_balance_of(
        &self,
        contract: &TronAddress,
        owner: &TronAddress,
    ) -> ChainResult<U256> {
        self.enter()?;
        Ok(self
            .token_balances
            .lock()
            .unwrap()
            .get(&(*contract, *owner))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn current_block_number(&self) -> ChainResult<u64> {
        self.enter()?;
        Ok(*self.head_block.lock().unwrap())
    }
}

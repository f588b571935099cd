use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use cucumber::World;
use mpe_engine::{
    clock::ManualClock,
    db_types::ReceivedTransaction,
    ChainClient,
    ChainClientError,
    ChainSettings,
    ConversionError,
    ConversionResult,
    MemoryDatabase,
    PaymentMonitor,
    RescanPolicy,
    TickSummary,
    VolatilityMonitor,
};
use parking_lot::Mutex;

/// A chain node whose answers are set up by the scenario.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChain {
    received: Arc<Mutex<HashMap<String, Vec<ReceivedTransaction>>>>,
    offline: Arc<Mutex<Vec<String>>>,
}

impl ScriptedChain {
    pub fn receive(&self, address: &str, tx: ReceivedTransaction) {
        self.received.lock().entry(address.to_string()).or_default().push(tx);
    }

    pub fn len(&self) -> usize {
        self.received.lock().values().map(Vec::len).sum()
    }

    pub fn take_offline(&self, address: &str) {
        self.offline.lock().push(address.to_string());
    }
}

impl ChainClient for ScriptedChain {
    async fn received_by_address(
        &self,
        address: &str,
        min_confirmations: u32,
    ) -> Result<Vec<ReceivedTransaction>, ChainClientError> {
        if self.offline.lock().iter().any(|a| a == address) {
            return Err(ChainClientError::Transport(format!("{address} is unreachable")));
        }
        let txs = self.received.lock().get(address).cloned().unwrap_or_default();
        Ok(txs.into_iter().filter(|tx| tx.confirmations >= min_confirmations).collect())
    }

    async fn import_viewing_key(&self, _: &str, _: RescanPolicy, _: Option<u64>) -> Result<(), ChainClientError> {
        Ok(())
    }
}

#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct EngineWorld {
    pub db: MemoryDatabase,
    pub clock: ManualClock,
    pub chain: ScriptedChain,
    pub chain_settings: ChainSettings,
    pub volatility: Option<VolatilityMonitor<MemoryDatabase>>,
    pub conversion: Option<Result<ConversionResult, ConversionError>>,
    /// purchase id -> payment id
    pub payments: HashMap<String, i64>,
    pub last_tick: Option<TickSummary>,
}

impl EngineWorld {
    pub fn new() -> Self {
        Self {
            db: MemoryDatabase::new(),
            clock: ManualClock::new(Utc::now()),
            chain: ScriptedChain::default(),
            chain_settings: ChainSettings::new("YEC", 10),
            volatility: None,
            conversion: None,
            payments: HashMap::new(),
            last_tick: None,
        }
    }

    pub fn payment_monitor(&self, currency: &str) -> PaymentMonitor<MemoryDatabase, ScriptedChain> {
        let settings = ChainSettings { currency: currency.to_ascii_uppercase(), ..self.chain_settings.clone() };
        PaymentMonitor::new(self.db.clone(), self.chain.clone(), settings).with_clock(Arc::new(self.clock.clone()))
    }

    pub fn volatility(&self) -> &VolatilityMonitor<MemoryDatabase> {
        self.volatility.as_ref().expect("The volatility monitor has not been set up")
    }

    pub fn payment_id(&self, purchase_id: &str) -> i64 {
        *self.payments.get(purchase_id).unwrap_or_else(|| panic!("No payment for purchase {purchase_id}"))
    }
}

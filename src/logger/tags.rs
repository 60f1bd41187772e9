/// Log tags identify the engine subsystem a message belongs to.
///
/// Each tag maps to a --debug-<key> command line flag for selective
/// debug output.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Api,
    Explorer,
    Price,
    Crawler,
    Ledger,
    Distribution,
    Pnl,
    Cache,
    Service,
}

impl LogTag {
    /// Key used for --debug-<key> flag matching
    pub fn to_debug_key(&self) -> &'static str {
        match self {
            LogTag::System => "system",
            LogTag::Api => "api",
            LogTag::Explorer => "explorer",
            LogTag::Price => "price",
            LogTag::Crawler => "crawler",
            LogTag::Ledger => "ledger",
            LogTag::Distribution => "distribution",
            LogTag::Pnl => "pnl",
            LogTag::Cache => "cache",
            LogTag::Service => "service",
        }
    }

    /// Uncolored tag text for file output
    pub fn to_plain_string(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Api => "API",
            LogTag::Explorer => "EXPLORER",
            LogTag::Price => "PRICE",
            LogTag::Crawler => "CRAWLER",
            LogTag::Ledger => "LEDGER",
            LogTag::Distribution => "DISTRIB",
            LogTag::Pnl => "PNL",
            LogTag::Cache => "CACHE",
            LogTag::Service => "SERVICE",
        }
    }
}

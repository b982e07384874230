/// Default scan universe: sector leaders with durable moats.
pub const MOAT_UNIVERSE: &[&str] = &[
    // Semiconductors
    "NVDA", "AMD", "TSM", "ASML", "AVGO", "QCOM",
    // Cloud / AI
    "MSFT", "AMZN", "GOOGL", "META", "ORCL", "SNOW", "CRM",
    // Consumer / cash cows
    "AAPL", "TSLA", "MCD", "SBUX", "KO", "JNJ", "PG", "COST", "WMT", "HD",
    // Payments / fintech
    "V", "MA", "PYPL", "SOFI",
];

pub fn moat_symbols() -> Vec<String> {
    MOAT_UNIVERSE.iter().map(|s| s.to_string()).collect()
}

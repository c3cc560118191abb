use serde::Deserialize;

/// `GET /api/qt/stock/kline/get` body. Both levels are nullable upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct KlineResponse {
    #[serde(default)]
    pub data: Option<KlineData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KlineData {
    #[serde(default)]
    pub klines: Option<Vec<String>>,
}

//! Order status values and the status-change flow used by the order page

pub mod flow;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use flow::{
    Confirm, FlowOutcome, HttpOrderGateway, Notice, NoticeLevel, OrderGateway, OrderStatusFlow,
    ProgressBar,
};

/// The five order states. Any state may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Cancelled,
    Processed,
    #[serde(rename = "Waiting Goods")]
    WaitingGoods,
    Delivery,
    Success,
}

impl OrderStatus {
    pub const ALL: [Self; 5] = [
        Self::Cancelled,
        Self::Processed,
        Self::WaitingGoods,
        Self::Delivery,
        Self::Success,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "Cancelled",
            Self::Processed => "Processed",
            Self::WaitingGoods => "Waiting Goods",
            Self::Delivery => "Delivery",
            Self::Success => "Success",
        }
    }

    /// Progress bar width in percent
    pub const fn progress_width(self) -> u8 {
        match self {
            Self::Cancelled => 0,
            Self::Processed => 5,
            Self::WaitingGoods => 35,
            Self::Delivery => 63,
            Self::Success => 100,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Progress width for a raw status string; `None` for anything unrecognised
pub fn progress_for(status: &str) -> Option<u8> {
    status.parse::<OrderStatus>().ok().map(OrderStatus::progress_width)
}

mod category;
mod stock;
mod vegetable;

pub use category::Category;
pub use stock::{DailyStock, MergeOutcome, QuantityOverflow, StockEntry, StockLedger};
pub use vegetable::{InvalidVegetableId, Vegetable, VegetableDraft, VegetableId};

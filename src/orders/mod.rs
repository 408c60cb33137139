//! Orders: the aggregate, its pricing and status rules, and the services
//! that apply them

pub mod code;
pub mod dashboard;
pub mod draft;
pub mod input;
pub mod model;
pub mod pricing;
pub mod service;
pub mod status;

pub use code::OrderCode;
pub use dashboard::{DashboardService, DashboardSummary, RankedEntry, RecentOrder};
pub use draft::{OrderDraft, QuantityChange, ReadyChange, merge_draft_items};
pub use input::{
    ClientInfoInput, DiscountInput, DraftItem, NewOrder, PaymentInput, QuantityInput, ReadyInput,
    StatusInput,
};
pub use model::{ClientInfo, Order, OrderAggregate, OrderItem, OrderProgress, OrderStatus, OrderView};
pub use service::{ItemUpdate, OrderService};
pub use status::{Transition, evaluate_auto_transition};

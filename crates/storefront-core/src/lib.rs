//! # storefront-core
//!
//! Client-side checkout for the storefront: payment intent setup, card
//! submission through a hosted payment processor, and reconciliation of the
//! payment into the order record.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        CheckoutFlow                           │
//! │  ┌──────────────────┐  ┌─────────────────┐  ┌──────────────┐ │
//! │  │ IntentInitializer│─▶│ PaymentProvider │─▶│OrderReconciler│ │
//! │  │  (OrderService)  │  │  tokenize/confirm│  │ (OrderService)│ │
//! │  └──────────────────┘  └─────────────────┘  └──────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `OrderService`, `PaymentProvider`, `TokenProvider` and `Notifier` are the
//! seams: the runtime crate plugs in HTTP and Stripe, tests plug in
//! [`mock`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut flow = CheckoutFlow::new(order, services, RetryPolicy::default());
//! flow.activate().await;
//! flow.attach_provider(Arc::new(stripe));
//! flow.set_card(card);
//!
//! match flow.submit().await {
//!     SubmitOutcome::Paid { transaction, .. } => show_receipt(&transaction.id),
//!     SubmitOutcome::TokenizeFailed(e) | SubmitOutcome::ConfirmFailed(e) => show_error(&e),
//!     SubmitOutcome::NotReady(_) => {}
//! }
//! ```

pub mod auth;
pub mod error;
pub mod flow;
pub mod intent;
pub mod mock;
pub mod notice;
pub mod order;
pub mod payment;
pub mod reconcile;
pub mod service;
pub mod signup;

pub use auth::{BearerToken, MemoryTokenStore, StaticToken, TokenProvider};
pub use error::{CheckoutError, Result};
pub use flow::{
    CheckoutFlow, CheckoutServices, FailureStage, FlowState, NotReadyReason, PaymentFailure,
    SubmitOutcome,
};
pub use intent::{IntentInitializer, IntentSync, IssuedIntent};
pub use notice::{MemoryNotifier, Notice, NoticeLevel, Notifier, TracingNotifier};
pub use order::{BillingDetails, Order, OrderId, PaymentRecord, PricedQuantity};
pub use payment::{CardDetails, PaymentMethod, PaymentProvider, TransactionResult};
pub use reconcile::{OrderReconciler, ReconcileOutcome, RetryPolicy};
pub use service::{OrderService, PaymentIntentRequest, PaymentIntentResponse};
pub use signup::{FieldError, SignupForm};

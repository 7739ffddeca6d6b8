//! Community membership and authorization service.
//!
//! Hexagonal layout: the domain core under [`domain`] defines entities,
//! services, and ports; [`inbound`] adapts HTTP requests onto the driving
//! ports; [`outbound`] implements the driven ports; [`server`] wires the
//! graph together.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

pub use doc::ApiDoc;
pub use middleware::Trace;

//! API call dispatch: dialects, transport, links, tasks and the dispatcher itself

mod dialect;
mod dispatcher;
mod envelope;
mod link;
mod query;
mod session;
mod task;
mod transport;

#[cfg(test)]
mod tests;

pub use dialect::{ApiDialect, with_version};
pub use dispatcher::{CallRequest, Dispatcher};
pub use envelope::{CallOutput, ResponseEnvelope};
pub use link::{Link, find_first_link};
pub use query::QueryParamsBuilder;
pub use session::Session;
pub use task::{PollingTaskMonitor, TaskMonitor, TaskRef};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};

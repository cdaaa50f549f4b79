/// Buzz arbiter granting first-buzz rights through the store's conditional update.
pub mod buzz_arbiter;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Match session gateway: authorization, action routing, persistence, timers.
pub mod match_service;
/// Fan-out event construction and publication.
pub mod sse_events;
/// Server-Sent Events subscription service.
pub mod sse_service;
/// Storage reconnection supervisor.
pub mod storage_supervisor;

/// Middleware module
///
/// Request authentication runs here; authorization is left to the
/// extractors each handler asks for.

mod session_gate;

pub use session_gate::SessionGate;

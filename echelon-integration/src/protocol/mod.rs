/// Minimal Http REST/WebSocket scaffolding shared by every `echelon-adapter` venue client.
pub mod http;

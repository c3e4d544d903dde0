/// Tabular methods, where every state-action value is stored explicitly
pub mod tabular;

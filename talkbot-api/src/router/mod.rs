pub mod auth_debug;
pub mod chat;
pub mod health;
pub mod router;
pub mod vision;

#[cfg(test)]
mod tests;

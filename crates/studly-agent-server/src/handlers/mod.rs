pub mod agent_card;
pub mod health;
pub mod tasks;

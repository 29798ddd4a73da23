pub mod audit;
pub mod capture;
pub mod dispatch;
pub mod findings;
pub mod health;
pub mod tenants;

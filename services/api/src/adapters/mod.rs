pub mod db;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod payment;
pub mod seed;

pub use db::DbAdapter;
pub use jwt::JwtTokenService;
pub use memory::MemoryDb;
pub use password::Argon2Hasher;
pub use payment::{FailureRoll, FixedRoll, MockPaymentGateway, ThreadRngRoll};

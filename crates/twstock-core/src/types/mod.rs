//! 피드 전반에서 공유하는 기본 타입.

mod period;
mod stock;

pub use period::*;
pub use stock::*;

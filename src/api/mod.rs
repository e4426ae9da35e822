// ==========================================
// 图书馆流通管理系统 - API层
// ==========================================
// 职责: 对外操作入口（柜台/管理端调用面），参数整形与读路径
// 红线: 所有错误信息必须包含显式原因
// ==========================================

pub mod error;
pub mod fine_api;
pub mod loan_api;
pub mod policy_api;
pub mod reservation_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use fine_api::FineApi;
pub use loan_api::LoanApi;
pub use policy_api::PolicyApi;
pub use reservation_api::ReservationApi;

// ==========================================
// 图书馆流通管理系统 - 主入口
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 流通事务引擎
// ==========================================

use library_circulation::app::{get_default_db_path, AppState};

fn main() {
    // 初始化日志系统
    library_circulation::logging::init();

    tracing::info!("==================================================");
    tracing::info!("图书馆流通管理系统 - 流通事务引擎");
    tracing::info!("系统版本: {}", library_circulation::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    // 创建AppState
    tracing::info!("正在初始化AppState...");
    let app_state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("无法初始化AppState: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("AppState初始化成功");

    // 策略一览（启动自检）
    match app_state.policy_api.list() {
        Ok(entries) => {
            for entry in entries {
                tracing::info!("借阅策略: {} = {}", entry.key, entry.value);
            }
        }
        Err(e) => tracing::warn!("借阅策略读取失败: {}", e),
    }

    tracing::info!("流通引擎就绪（嵌入本库使用，详见 api 模块）");
}

// ==========================================
// 借阅引擎集成测试
// ==========================================
// 职责: 验证借出/归还/续借状态机与罚款、预约联动
// ==========================================


#[cfg(test)]
mod loan_engine_test {
    use chrono::Duration;
    use library_circulation::app::AppState;
    use library_circulation::domain::types::ReservationStatus;
    use library_circulation::ApiError;
    use tempfile::NamedTempFile;

    use crate::test_helpers::*;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    /// 创建测试环境: 1馆员 + 1借阅者 + 1题名2复本
    fn setup_test_env() -> (NamedTempFile, String, AppState) {
        let (temp_file, db_path) = create_test_db().unwrap();

        let conn = open_conn(&db_path).unwrap();
        seed_staff(&conn, "S1").unwrap();
        seed_member(&conn, "M1", "alice", 5).unwrap();
        seed_member(&conn, "M2", "bob", 5).unwrap();
        seed_title_with_copies(&conn, "978-7-111", "Rust程序设计", &["BC001", "BC002"]).unwrap();

        let app_state = AppState::new(db_path.clone()).expect("无法初始化AppState");
        (temp_file, db_path, app_state)
    }

    // ==========================================
    // 测试1: 借出-按时归还（不产生罚款）
    // ==========================================

    #[test]
    fn test_checkout_and_ontime_return_no_fine() {
        let (_temp_file, db_path, state) = setup_test_env();

        let detail = state.loan_api.checkout("alice", "BC001", "S1").unwrap();
        assert_eq!(detail.loan.member_id, "M1");
        assert_eq!(detail.title, "Rust程序设计");
        assert_eq!(detail.loan.renewal_count, 0);
        // 默认借阅周期 14 天
        assert_eq!(
            detail.loan.due_date - detail.loan.issue_date,
            Duration::days(14)
        );

        let conn = open_conn(&db_path).unwrap();
        assert_eq!(copy_status(&conn, "BC001").unwrap(), "Loaned");

        let outcome = state.loan_api.checkin(&detail.loan.loan_id, "S1").unwrap();
        assert!(outcome.fine.is_none(), "按时归还不应产生罚款");
        assert!(outcome.reservation.is_none());
        assert!(outcome.loan.return_date.is_some());
        assert_eq!(copy_status(&conn, "BC001").unwrap(), "Available");

        // 审计旁路: 借出与归还各一条，上下文为 JSON
        assert_eq!(audit_count(&conn, "CHECKOUT").unwrap(), 1);
        assert_eq!(audit_count(&conn, "CHECKIN").unwrap(), 1);
        let detail = latest_audit_detail(&conn, "CHECKOUT").unwrap();
        assert_eq!(detail["barcode"], "BC001");
        assert_eq!(detail["member_id"], "M1");
        let detail = latest_audit_detail(&conn, "CHECKIN").unwrap();
        assert!(detail["fine_amount"].is_null(), "按时归还无罚款上下文");

        println!("✅ 借出-按时归还测试通过");
    }

    // ==========================================
    // 测试2: 逾期归还产生罚款（14天周期，第19天归还 → 25000）
    // ==========================================

    #[test]
    fn test_overdue_return_creates_fine() {
        let (_temp_file, db_path, state) = setup_test_env();

        let detail = state.loan_api.checkout("alice", "BC001", "S1").unwrap();

        // 回拨应还时间 5 天，相当于第 19 天才归还
        let conn = open_conn(&db_path).unwrap();
        backdate_due_date(&conn, &detail.loan.loan_id, 5).unwrap();

        let outcome = state.loan_api.checkin(&detail.loan.loan_id, "S1").unwrap();
        let fine = outcome.fine.expect("逾期归还应产生罚款");
        // 5 天 × 5000/天
        assert_eq!(fine.amount, 25000);
        assert_eq!(fine.member_id, "M1");
        assert_eq!(fine.loan_id, detail.loan.loan_id);

        println!("✅ 逾期罚款测试通过: amount={}", fine.amount);
    }

    // ==========================================
    // 测试3: 续借顺延与次数上限
    // ==========================================

    #[test]
    fn test_renewal_extends_due_date_and_caps() {
        let (_temp_file, _db_path, state) = setup_test_env();

        let detail = state.loan_api.checkout("alice", "BC001", "S1").unwrap();
        let due0 = detail.loan.due_date;

        // 第一次续借: 自原应还时间顺延 14 天
        let renewed = state.loan_api.renew(&detail.loan.loan_id, "M1").unwrap();
        assert_eq!(renewed.renewal_count, 1);
        assert_eq!(renewed.due_date, due0 + Duration::days(14));

        // 第二次续借
        let renewed = state.loan_api.renew(&detail.loan.loan_id, "M1").unwrap();
        assert_eq!(renewed.renewal_count, 2);
        assert_eq!(renewed.due_date, due0 + Duration::days(28));

        // 第三次续借: 超过 max_renewals=2
        let result = state.loan_api.renew(&detail.loan.loan_id, "M1");
        match result {
            Err(ApiError::BadRequest(msg)) => assert!(msg.contains("最大续借次数")),
            other => panic!("应拒绝第三次续借: {:?}", other.map(|l| l.loan_id)),
        }

        println!("✅ 续借顺延与上限测试通过");
    }

    // ==========================================
    // 测试4: 题名有排队预约时不可续借
    // ==========================================

    #[test]
    fn test_renew_blocked_by_pending_reservation() {
        let (_temp_file, _db_path, state) = setup_test_env();

        let detail = state.loan_api.checkout("alice", "BC001", "S1").unwrap();
        state.reservation_api.create("M2", "978-7-111").unwrap();

        let result = state.loan_api.renew(&detail.loan.loan_id, "M1");
        match result {
            Err(ApiError::BadRequest(msg)) => assert!(msg.contains("预约")),
            other => panic!("有排队预约时续借应被拒绝: {:?}", other.map(|l| l.loan_id)),
        }

        println!("✅ 预约拦截续借测试通过");
    }

    // ==========================================
    // 测试5: 归还按先到先得兑现预约
    // ==========================================

    #[test]
    fn test_return_fulfills_reservations_fifo() {
        let (_temp_file, db_path, state) = setup_test_env();

        let conn = open_conn(&db_path).unwrap();
        seed_member(&conn, "M3", "carol", 5).unwrap();

        // alice 借走两个复本
        let loan1 = state.loan_api.checkout("alice", "BC001", "S1").unwrap();
        let loan2 = state.loan_api.checkout("alice", "BC002", "S1").unwrap();

        // bob 先预约，carol 后预约
        let reserve_a = state.reservation_api.create("M2", "978-7-111").unwrap();
        let reserve_b = state.reservation_api.create("M3", "978-7-111").unwrap();

        // 第一次归还兑现 bob
        let outcome1 = state.loan_api.checkin(&loan1.loan.loan_id, "S1").unwrap();
        let fulfilled1 = outcome1.reservation.expect("应兑现最早的预约");
        assert_eq!(fulfilled1.reserve_id, reserve_a.reserve_id);
        assert_eq!(fulfilled1.status, ReservationStatus::Fulfilled);
        assert!(fulfilled1.expiry_date.is_some(), "兑现后应设置保留期截止");
        assert_eq!(copy_status(&conn, "BC001").unwrap(), "Reserved");

        // 第二次归还兑现 carol
        let outcome2 = state.loan_api.checkin(&loan2.loan.loan_id, "S1").unwrap();
        let fulfilled2 = outcome2.reservation.expect("应兑现第二个预约");
        assert_eq!(fulfilled2.reserve_id, reserve_b.reserve_id);
        assert_eq!(copy_status(&conn, "BC002").unwrap(), "Reserved");

        // 取书通知各一条
        let notifications: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM notification WHERE kind = 'ReservationReady'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(notifications, 2);

        println!("✅ 预约先到先得兑现测试通过");
    }

    // ==========================================
    // 测试6: 借出拒绝路径
    // ==========================================

    #[test]
    fn test_checkout_rejections() {
        let (_temp_file, db_path, state) = setup_test_env();

        // 非馆员办理
        let result = state.loan_api.checkout("alice", "BC001", "M2");
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        // 借阅者不存在
        let result = state.loan_api.checkout("nobody", "BC001", "S1");
        assert!(matches!(result, Err(ApiError::NotFound(_))));

        // 复本不存在: 认领零行，与不可借同等视为冲突
        let result = state.loan_api.checkout("alice", "BC999", "S1");
        match result {
            Err(ApiError::Conflict(msg)) => assert!(msg.contains("BC999")),
            other => panic!(
                "未知条码应视为冲突: {:?}",
                other.map(|d| d.loan.loan_id)
            ),
        }

        // 冻结账户
        let conn = open_conn(&db_path).unwrap();
        suspend_member(&conn, "M2").unwrap();
        let result = state.loan_api.checkout("bob", "BC001", "S1");
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        // 已借出的复本
        state.loan_api.checkout("alice", "BC001", "S1").unwrap();
        let result = state.loan_api.checkout("alice", "BC001", "S1");
        assert!(matches!(result, Err(ApiError::Conflict(_))));

        println!("✅ 借出拒绝路径测试通过");
    }

    // ==========================================
    // 测试7: 借出上限
    // ==========================================

    #[test]
    fn test_borrowing_limit_enforced() {
        let (_temp_file, db_path, state) = setup_test_env();

        let conn = open_conn(&db_path).unwrap();
        seed_member(&conn, "M9", "dave", 1).unwrap();

        state.loan_api.checkout("dave", "BC001", "S1").unwrap();
        let result = state.loan_api.checkout("dave", "BC002", "S1");
        match result {
            Err(ApiError::BadRequest(msg)) => assert!(msg.contains("借阅上限")),
            other => panic!("超过借出上限应被拒绝: {:?}", other.map(|d| d.loan.loan_id)),
        }

        println!("✅ 借出上限测试通过");
    }

    // ==========================================
    // 测试8: 重复归还与越权续借
    // ==========================================

    #[test]
    fn test_double_checkin_and_foreign_renew() {
        let (_temp_file, _db_path, state) = setup_test_env();

        let detail = state.loan_api.checkout("alice", "BC001", "S1").unwrap();

        // bob 尝试续借 alice 的借阅
        let result = state.loan_api.renew(&detail.loan.loan_id, "M2");
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        state.loan_api.checkin(&detail.loan.loan_id, "S1").unwrap();

        // 重复归还
        let result = state.loan_api.checkin(&detail.loan.loan_id, "S1");
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        // 已归还的借阅不可续借
        let result = state.loan_api.renew(&detail.loan.loan_id, "M1");
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        println!("✅ 重复归还/越权续借测试通过");
    }

    // ==========================================
    // 测试9: 读路径（在借/历史/全量台账）
    // ==========================================

    #[test]
    fn test_loan_read_paths() {
        let (_temp_file, _db_path, state) = setup_test_env();

        let loan1 = state.loan_api.checkout("alice", "BC001", "S1").unwrap();
        let loan2 = state.loan_api.checkout("alice", "BC002", "S1").unwrap();

        let active = state.loan_api.list_active_loans("M1").unwrap();
        assert_eq!(active.len(), 2);

        state.loan_api.checkin(&loan1.loan.loan_id, "S1").unwrap();

        let active = state.loan_api.list_active_loans("M1").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].loan.loan_id, loan2.loan.loan_id);

        let history = state.loan_api.list_history("M1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].loan.loan_id, loan1.loan.loan_id);

        let all = state.loan_api.list_all_loans(None).unwrap();
        assert_eq!(all.len(), 2);

        println!("✅ 借阅读路径测试通过");
    }
}

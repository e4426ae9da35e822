// ==========================================
// 借阅策略集成测试
// ==========================================
// 职责: 验证策略播种、更新可见性与管理端校验
// ==========================================


#[cfg(test)]
mod policy_store_test {
    use chrono::Duration;
    use library_circulation::app::AppState;
    use library_circulation::config::policy_keys;
    use library_circulation::ApiError;
    use tempfile::NamedTempFile;

    use crate::test_helpers::*;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn setup_test_env() -> (NamedTempFile, String, AppState) {
        let (temp_file, db_path) = create_test_db().unwrap();

        let conn = open_conn(&db_path).unwrap();
        seed_staff(&conn, "S1").unwrap();
        seed_member(&conn, "M1", "alice", 5).unwrap();
        seed_title_with_copies(&conn, "978-7-555", "策略测试题名", &["BC400"]).unwrap();

        let state = AppState::new(db_path.clone()).expect("无法初始化AppState");
        (temp_file, db_path, state)
    }

    // ==========================================
    // 测试1: 默认策略播种
    // ==========================================

    #[test]
    fn test_default_policies_seeded() {
        let (_temp_file, _db_path, state) = setup_test_env();

        assert_eq!(
            state.policy_api.get(policy_keys::LOAN_PERIOD_DAYS).unwrap(),
            "14"
        );
        assert_eq!(state.policy_api.get(policy_keys::MAX_RENEWALS).unwrap(), "2");
        assert_eq!(
            state
                .policy_api
                .get(policy_keys::FINE_RATE_PER_DAY)
                .unwrap(),
            "5000"
        );
        assert_eq!(
            state
                .policy_api
                .get(policy_keys::FINE_BLOCK_THRESHOLD)
                .unwrap(),
            "50000"
        );
        assert_eq!(
            state
                .policy_api
                .get(policy_keys::RESERVATION_HOLD_DAYS)
                .unwrap(),
            "3"
        );

        let entries = state.policy_api.list().unwrap();
        assert_eq!(entries.len(), 5);

        println!("✅ 默认策略播种测试通过");
    }

    // ==========================================
    // 测试2: 策略修改对后续事务即时可见（不缓存）
    // ==========================================

    #[test]
    fn test_policy_update_visible_to_next_transaction() {
        let (_temp_file, _db_path, state) = setup_test_env();

        state
            .policy_api
            .set(policy_keys::LOAN_PERIOD_DAYS, "21", "S1")
            .unwrap();

        // 下一笔借出立即使用新周期
        let detail = state.loan_api.checkout("alice", "BC400", "S1").unwrap();
        assert_eq!(
            detail.loan.due_date - detail.loan.issue_date,
            Duration::days(21)
        );

        println!("✅ 策略即时可见性测试通过");
    }

    // ==========================================
    // 测试3: 更新校验（权限/未知键/非整数值）
    // ==========================================

    #[test]
    fn test_policy_update_validations() {
        let (_temp_file, db_path, state) = setup_test_env();

        // 非馆员不可修改
        let result = state
            .policy_api
            .set(policy_keys::MAX_RENEWALS, "3", "M1");
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        // 未知键不可创建
        let result = state.policy_api.set("no_such_policy", "1", "S1");
        assert!(matches!(result, Err(ApiError::NotFound(_))));

        // 非整数值
        let result = state
            .policy_api
            .set(policy_keys::MAX_RENEWALS, "many", "S1");
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));

        // 成功路径带审计
        state
            .policy_api
            .set(policy_keys::MAX_RENEWALS, "3", "S1")
            .unwrap();
        let conn = open_conn(&db_path).unwrap();
        assert_eq!(audit_count(&conn, "UPDATE_POLICY").unwrap(), 1);

        println!("✅ 策略更新校验测试通过");
    }

    // ==========================================
    // 测试4: 未付罚款阈值拦截续借（严格大于）
    // ==========================================

    #[test]
    fn test_fine_threshold_blocks_renewal() {
        let (_temp_file, db_path, state) = setup_test_env();

        // 把阈值压低到 10000，制造 3 天逾期罚款 15000
        state
            .policy_api
            .set(policy_keys::FINE_BLOCK_THRESHOLD, "10000", "S1")
            .unwrap();

        let conn = open_conn(&db_path).unwrap();
        seed_title_with_copies(&conn, "978-7-556", "第二题名", &["BC401"]).unwrap();

        let overdue = state.loan_api.checkout("alice", "BC400", "S1").unwrap();
        backdate_due_date(&conn, &overdue.loan.loan_id, 3).unwrap();
        state.loan_api.checkin(&overdue.loan.loan_id, "S1").unwrap();
        assert_eq!(state.fine_api.total_unpaid("M1").unwrap(), 15000);

        // 在借的另一笔不可续借
        let active = state.loan_api.checkout("alice", "BC401", "S1").unwrap();
        let result = state.loan_api.renew(&active.loan.loan_id, "M1");
        match result {
            Err(ApiError::BadRequest(msg)) => assert!(msg.contains("罚款")),
            other => panic!("未付罚款超阈值应拦截续借: {:?}", other.map(|l| l.loan_id)),
        }

        // 阈值相等不拦截（严格大于）
        state
            .policy_api
            .set(policy_keys::FINE_BLOCK_THRESHOLD, "15000", "S1")
            .unwrap();
        assert!(state.loan_api.renew(&active.loan.loan_id, "M1").is_ok());

        println!("✅ 罚款阈值拦截测试通过");
    }
}

// ==========================================
// 罚款 API 集成测试
// ==========================================
// 职责: 验证罚款支付/减免的状态机与台账读路径
// ==========================================


#[cfg(test)]
mod fine_api_test {
    use library_circulation::app::AppState;
    use library_circulation::domain::types::{FineStatus, PaymentMethod};
    use library_circulation::ApiError;
    use tempfile::NamedTempFile;

    use crate::test_helpers::*;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    /// 创建测试环境并制造一笔 3 天逾期的罚款（3 × 5000 = 15000）
    fn setup_with_fine() -> (NamedTempFile, String, AppState, String) {
        let (temp_file, db_path) = create_test_db().unwrap();

        let conn = open_conn(&db_path).unwrap();
        seed_staff(&conn, "S1").unwrap();
        seed_member(&conn, "M1", "alice", 5).unwrap();
        seed_member(&conn, "M2", "bob", 5).unwrap();
        seed_title_with_copies(&conn, "978-7-333", "罚款测试题名", &["BC200"]).unwrap();

        let state = AppState::new(db_path.clone()).expect("无法初始化AppState");

        let detail = state.loan_api.checkout("alice", "BC200", "S1").unwrap();
        backdate_due_date(&conn, &detail.loan.loan_id, 3).unwrap();
        let outcome = state.loan_api.checkin(&detail.loan.loan_id, "S1").unwrap();
        let fine = outcome.fine.expect("逾期归还应产生罚款");
        assert_eq!(fine.amount, 15000);

        (temp_file, db_path, state, fine.fine_id)
    }

    // ==========================================
    // 测试1: 支付流程
    // ==========================================

    #[test]
    fn test_pay_fine_flow() {
        let (_temp_file, db_path, state, fine_id) = setup_with_fine();

        assert_eq!(state.fine_api.total_unpaid("M1").unwrap(), 15000);

        let outcome = state
            .fine_api
            .pay(&fine_id, "M1", PaymentMethod::Cash)
            .unwrap();
        assert_eq!(outcome.payment.amount, 15000);
        assert!(outcome.payment.transaction_ref.starts_with("TXN-"));
        assert_eq!(outcome.fine.status, FineStatus::Paid);

        // 结清后未付总额清零
        assert_eq!(state.fine_api.total_unpaid("M1").unwrap(), 0);

        let fines = state.fine_api.list_fines("M1", None).unwrap();
        assert_eq!(fines.len(), 1);
        assert_eq!(fines[0].status, FineStatus::Paid);
        assert!(fines[0].paid_at.is_some());

        // 支付流水可对账
        let payments = state.fine_api.list_payments(&fine_id).unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].payment_id, outcome.payment.payment_id);

        // 审计旁路
        let conn = open_conn(&db_path).unwrap();
        assert_eq!(audit_count(&conn, "PAY_FINE").unwrap(), 1);

        println!("✅ 罚款支付流程测试通过");
    }

    // ==========================================
    // 测试2: 支付拒绝路径
    // ==========================================

    #[test]
    fn test_pay_fine_rejections() {
        let (_temp_file, db_path, state, fine_id) = setup_with_fine();

        // 非责任人支付
        let result = state.fine_api.pay(&fine_id, "M2", PaymentMethod::Card);
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        // 罚款不存在
        let result = state.fine_api.pay("no-such-fine", "M1", PaymentMethod::Card);
        assert!(matches!(result, Err(ApiError::NotFound(_))));

        // 重复支付
        state
            .fine_api
            .pay(&fine_id, "M1", PaymentMethod::Card)
            .unwrap();
        let result = state.fine_api.pay(&fine_id, "M1", PaymentMethod::Card);
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        // 重复支付不产生第二条流水
        let conn = open_conn(&db_path).unwrap();
        assert_eq!(payment_count(&conn, &fine_id).unwrap(), 1);

        println!("✅ 罚款支付拒绝路径测试通过");
    }

    // ==========================================
    // 测试3: 减免流程
    // ==========================================

    #[test]
    fn test_waive_fine_flow() {
        let (_temp_file, db_path, state, fine_id) = setup_with_fine();

        // 非馆员不可减免
        let result = state.fine_api.waive(&fine_id, "M2", "人情减免");
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        let waived = state
            .fine_api
            .waive(&fine_id, "S1", "系统故障期间归还")
            .unwrap();
        assert_eq!(waived.status, FineStatus::Waived);
        assert_eq!(waived.waived_by.as_deref(), Some("S1"));
        assert_eq!(waived.waive_reason.as_deref(), Some("系统故障期间归还"));
        assert!(waived.waived_at.is_some());

        assert_eq!(state.fine_api.total_unpaid("M1").unwrap(), 0);

        // 已减免的罚款不可再支付
        let result = state.fine_api.pay(&fine_id, "M1", PaymentMethod::Cash);
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        let conn = open_conn(&db_path).unwrap();
        assert_eq!(audit_count(&conn, "WAIVE_FINE").unwrap(), 1);

        println!("✅ 罚款减免流程测试通过");
    }

    // ==========================================
    // 测试4: 台账状态过滤
    // ==========================================

    #[test]
    fn test_list_fines_status_filter() {
        let (_temp_file, db_path, state, fine_id) = setup_with_fine();

        // 再制造一笔未付罚款
        let conn = open_conn(&db_path).unwrap();
        seed_title_with_copies(&conn, "978-7-334", "第二题名", &["BC201"]).unwrap();
        let detail = state.loan_api.checkout("alice", "BC201", "S1").unwrap();
        backdate_due_date(&conn, &detail.loan.loan_id, 1).unwrap();
        state.loan_api.checkin(&detail.loan.loan_id, "S1").unwrap();

        state
            .fine_api
            .pay(&fine_id, "M1", PaymentMethod::Online)
            .unwrap();

        let unpaid = state
            .fine_api
            .list_fines("M1", Some(FineStatus::Unpaid))
            .unwrap();
        assert_eq!(unpaid.len(), 1);
        assert_eq!(unpaid[0].amount, 5000);

        let paid = state
            .fine_api
            .list_fines("M1", Some(FineStatus::Paid))
            .unwrap();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].fine_id, fine_id);

        assert_eq!(state.fine_api.list_fines("M1", None).unwrap().len(), 2);

        println!("✅ 罚款台账过滤测试通过");
    }
}

// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证并发借出/并发支付下的条件更新裁决
// ==========================================


#[cfg(test)]
mod concurrent_circulation_test {
    use library_circulation::app::AppState;
    use library_circulation::ApiError;
    use std::sync::Arc;
    use std::thread;
    use tempfile::NamedTempFile;

    use crate::test_helpers::*;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    /// 创建测试环境: 1馆员 + 5借阅者 + 1题名1复本
    fn setup_test_env() -> (NamedTempFile, String, Arc<AppState>) {
        let (temp_file, db_path) = create_test_db().unwrap();

        let conn = open_conn(&db_path).unwrap();
        seed_staff(&conn, "S1").unwrap();
        for i in 1..=5 {
            seed_member(&conn, &format!("M{}", i), &format!("reader{}", i), 5).unwrap();
        }
        seed_title_with_copies(&conn, "978-7-222", "并发测试题名", &["BC100"]).unwrap();

        let app_state = Arc::new(AppState::new(db_path.clone()).expect("无法初始化AppState"));
        (temp_file, db_path, app_state)
    }

    // ==========================================
    // 测试1: 并发借出同一复本，恰好一人成功
    // ==========================================

    #[test]
    fn test_concurrent_checkout_single_winner() {
        let (_temp_file, db_path, state) = setup_test_env();

        let mut handles = vec![];
        for i in 1..=5 {
            let state = Arc::clone(&state);
            let handle = thread::spawn(move || {
                state
                    .loan_api
                    .checkout(&format!("reader{}", i), "BC100", "S1")
            });
            handles.push(handle);
        }

        let mut success_count = 0;
        let mut conflict_count = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => success_count += 1,
                Err(ApiError::Conflict(_)) => conflict_count += 1,
                Err(e) => panic!("并发借出只应出现 Conflict 失败: {}", e),
            }
        }

        assert_eq!(success_count, 1, "恰好一个借出成功");
        assert_eq!(conflict_count, 4, "其余借出应为 Conflict");

        // 数据侧复核: 复本 Loaned，Active 借阅只有一条
        let conn = open_conn(&db_path).unwrap();
        assert_eq!(copy_status(&conn, "BC100").unwrap(), "Loaned");
        let active: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM loan WHERE barcode = 'BC100' AND status = 'Active'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(active, 1);

        println!("✅ 并发借出测试通过: 1成功/{}冲突", conflict_count);
    }

    // ==========================================
    // 测试2: 并发支付同一罚款，只产生一条支付流水
    // ==========================================

    #[test]
    fn test_concurrent_pay_single_payment() {
        let (_temp_file, db_path, state) = setup_test_env();

        // 制造一笔逾期罚款
        let detail = state.loan_api.checkout("reader1", "BC100", "S1").unwrap();
        let conn = open_conn(&db_path).unwrap();
        backdate_due_date(&conn, &detail.loan.loan_id, 3).unwrap();
        let outcome = state.loan_api.checkin(&detail.loan.loan_id, "S1").unwrap();
        let fine = outcome.fine.expect("逾期归还应产生罚款");

        // 4 个线程并发支付
        let mut handles = vec![];
        for _ in 0..4 {
            let state = Arc::clone(&state);
            let fine_id = fine.fine_id.clone();
            let handle = thread::spawn(move || {
                state.fine_api.pay(
                    &fine_id,
                    "M1",
                    library_circulation::PaymentMethod::Online,
                )
            });
            handles.push(handle);
        }

        let mut success_count = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => success_count += 1,
                Err(ApiError::BadRequest(_)) | Err(ApiError::Conflict(_)) => {}
                Err(e) => panic!("并发支付只应出现已结清类失败: {}", e),
            }
        }

        assert_eq!(success_count, 1, "恰好一次支付成功");
        assert_eq!(payment_count(&conn, &fine.fine_id).unwrap(), 1);

        println!("✅ 并发支付测试通过");
    }

    // ==========================================
    // 测试3: 并发续借同一借阅，次数不超发
    // ==========================================

    #[test]
    fn test_concurrent_renew_respects_cap() {
        let (_temp_file, db_path, state) = setup_test_env();

        let detail = state.loan_api.checkout("reader1", "BC100", "S1").unwrap();

        // max_renewals=2，5 个线程并发续借，最多 2 次成功
        let mut handles = vec![];
        for _ in 0..5 {
            let state = Arc::clone(&state);
            let loan_id = detail.loan.loan_id.clone();
            let handle = thread::spawn(move || state.loan_api.renew(&loan_id, "M1"));
            handles.push(handle);
        }

        let mut success_count = 0;
        for handle in handles {
            if handle.join().unwrap().is_ok() {
                success_count += 1;
            }
        }
        assert!(success_count <= 2, "续借成功次数不得超过上限");

        let conn = open_conn(&db_path).unwrap();
        let renewal_count: i32 = conn
            .query_row(
                "SELECT renewal_count FROM loan WHERE loan_id = ?1",
                [&detail.loan.loan_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(renewal_count as usize, success_count);
        assert!(renewal_count <= 2);

        println!("✅ 并发续借测试通过: {}次成功", success_count);
    }
}

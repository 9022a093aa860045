use speculate2::speculate;

speculate! {
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use sekolah_admin::db::{Database, StoreError};
    use sekolah_admin::models::{
        AchievementInput, ActivityInput, ApproveReportInput, EstimatedWeek, EvaluationItem,
        ExpenseItemInput, ExpenseUnit, FundSource, MemoTableInput, RealizationItemInput,
        RecordId, ReportPeriod, ReportStatus, ReviewRabInput, Role, SaveMemoInput, SaveRabInput,
        SaveRealizationItemsInput, SaveReportInput, Score, SessionContext, SignInInput,
        SignUpInput, Signatures, UpdateProfileInput,
    };
    use sekolah_admin::realtime::ChangeOp;
    use sekolah_admin::workflow;

    fn setup_db() -> Database {
        let db = Database::open_memory().expect("failed to open in-memory database");
        db.migrate().expect("failed to migrate");
        db
    }

    fn sign_up_principal(db: &Database, username: &str) -> SessionContext {
        let session = db
            .sign_up(SignUpInput {
                username: username.into(),
                password: "rahasia123".into(),
                full_name: format!("Kepala {username}"),
            })
            .expect("sign up failed");
        SessionContext::new(session.profile.id, session.profile.role)
    }

    fn foundation() -> SessionContext {
        SessionContext::new(Uuid::new_v4(), Role::Foundation)
    }

    fn admin() -> SessionContext {
        SessionContext::new(Uuid::new_v4(), Role::Admin)
    }

    fn report_input(activities: &[&str]) -> SaveReportInput {
        SaveReportInput {
            id: RecordId::Pending("tmp-report".into()),
            date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            principal_name: "Ibu Sari".into(),
            school_name: "SD Harapan".into(),
            period: ReportPeriod::Monthly,
            activities: activities
                .iter()
                .enumerate()
                .map(|(i, name)| ActivityInput {
                    id: RecordId::Pending(format!("tmp-act-{i}")),
                    name: (*name).into(),
                    description: None,
                    date: None,
                })
                .collect(),
            achievements: vec![AchievementInput {
                id: RecordId::Pending("tmp-ach-0".into()),
                title: "Juara lomba".into(),
                description: None,
            }],
            principal_evaluation: EvaluationItem::ALL
                .into_iter()
                .map(|item| (item, Score::new(7).unwrap()))
                .collect(),
        }
    }

    fn expense_input(tmp: &str, amount: i64) -> ExpenseItemInput {
        ExpenseItemInput {
            id: RecordId::Pending(tmp.into()),
            description: "ATK".into(),
            volume: 1,
            unit: ExpenseUnit::Pack,
            unit_price: amount,
            amount,
            fund_source: FundSource::Bos,
            estimated_week: EstimatedWeek::Week1,
        }
    }

    fn rab_input() -> SaveRabInput {
        SaveRabInput {
            id: RecordId::Pending("tmp-rab".into()),
            institution_name: "SD Harapan".into(),
            period: "Juli".into(),
            year: 2025,
            routine_expenses: vec![expense_input("tmp-exp-0", 150_000)],
            incidental_expenses: vec![expense_input("tmp-exp-1", 50_000)],
            signatures: Signatures::default(),
        }
    }

    fn full_evaluation() -> sekolah_admin::models::Evaluation {
        EvaluationItem::ALL
            .into_iter()
            .map(|item| (item, Score::new(9).unwrap()))
            .collect()
    }

    describe "auth" {
        it "signs up a principal and resolves the session token" {
            let db = setup_db();
            let session = db
                .sign_up(SignUpInput {
                    username: "sari".into(),
                    password: "rahasia123".into(),
                    full_name: "Sari".into(),
                })
                .unwrap();

            assert_eq!(session.profile.role, Role::Principal);

            let ctx = db.resolve_session(&session.token).unwrap();
            assert_eq!(ctx.user_id, session.profile.id);
            assert_eq!(ctx.role, Role::Principal);
        }

        it "rejects a duplicate username" {
            let db = setup_db();
            sign_up_principal(&db, "sari");

            let err = db
                .sign_up(SignUpInput {
                    username: "sari".into(),
                    password: "lain".into(),
                    full_name: "Sari Kedua".into(),
                })
                .unwrap_err();
            assert!(matches!(err, StoreError::UsernameTaken));
        }

        it "rejects a wrong password" {
            let db = setup_db();
            sign_up_principal(&db, "sari");

            let err = db
                .sign_in(SignInInput { username: "sari".into(), password: "salah".into() })
                .unwrap_err();
            assert!(matches!(err, StoreError::InvalidCredentials));
        }

        it "invalidates the token on sign out" {
            let db = setup_db();
            let session = db
                .sign_up(SignUpInput {
                    username: "sari".into(),
                    password: "rahasia123".into(),
                    full_name: "Sari".into(),
                })
                .unwrap();

            db.sign_out(&session.token).unwrap();
            assert!(matches!(
                db.resolve_session(&session.token),
                Err(StoreError::InvalidToken)
            ));
        }

        it "resets the password with a single-use token" {
            let db = setup_db();
            let session = db
                .sign_up(SignUpInput {
                    username: "sari".into(),
                    password: "rahasia123".into(),
                    full_name: "Sari".into(),
                })
                .unwrap();

            let reset = db.request_password_reset("sari").unwrap();
            db.confirm_password_reset(&reset, "baru456").unwrap();

            // Old password and old sessions are both dead.
            assert!(db
                .sign_in(SignInInput { username: "sari".into(), password: "rahasia123".into() })
                .is_err());
            assert!(db.resolve_session(&session.token).is_err());
            assert!(db
                .sign_in(SignInInput { username: "sari".into(), password: "baru456".into() })
                .is_ok());

            // The token does not work twice.
            assert!(db.confirm_password_reset(&reset, "lagi789").is_err());
        }
    }

    describe "report gateway" {
        it "creates a draft with its activities and achievements" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");

            let report = db.save_report(&ctx, report_input(&["Upacara", "Rapat guru"])).unwrap();

            assert_eq!(report.status, ReportStatus::Draft);
            assert_eq!(report.user_id, ctx.user_id);
            assert_eq!(report.activities.len(), 2);
            assert_eq!(report.achievements.len(), 1);
            assert_eq!(report.principal_evaluation.len(), EvaluationItem::ALL.len());
        }

        it "replaces children by diff on resave" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let report = db.save_report(&ctx, report_input(&["Upacara", "Rapat guru"])).unwrap();

            let kept = report.activities[0].clone();
            let mut input = report_input(&[]);
            input.id = RecordId::from(report.id);
            input.activities = vec![
                ActivityInput {
                    id: RecordId::from(kept.id),
                    name: "Upacara (revisi)".into(),
                    description: Some("Setiap Senin".into()),
                    date: None,
                },
                ActivityInput {
                    id: RecordId::Pending("tmp-new".into()),
                    name: "Kunjungan kelas".into(),
                    description: None,
                    date: None,
                },
            ];
            input.achievements = vec![];

            let updated = db.save_report(&ctx, input).unwrap();

            assert_eq!(updated.activities.len(), 2);
            // The kept row keeps its server id, the dropped one is gone.
            assert!(updated.activities.iter().any(|a| a.id == kept.id));
            assert!(updated.activities.iter().any(|a| a.name == "Kunjungan kelas"));
            assert!(!updated.activities.iter().any(|a| a.name == "Rapat guru"));
            assert!(updated.achievements.is_empty());
        }

        it "is idempotent when the same children are saved again" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let report = db.save_report(&ctx, report_input(&["Upacara"])).unwrap();

            let mut input = report_input(&[]);
            input.id = RecordId::from(report.id);
            input.activities = report
                .activities
                .iter()
                .map(|a| ActivityInput {
                    id: RecordId::from(a.id),
                    name: a.name.clone(),
                    description: a.description.clone(),
                    date: a.date,
                })
                .collect();
            input.achievements = report
                .achievements
                .iter()
                .map(|a| AchievementInput {
                    id: RecordId::from(a.id),
                    title: a.title.clone(),
                    description: a.description.clone(),
                })
                .collect();

            let resaved = db.save_report(&ctx, input).unwrap();
            assert_eq!(resaved.activities.len(), report.activities.len());
            assert_eq!(resaved.activities[0].id, report.activities[0].id);
            assert_eq!(resaved.achievements[0].id, report.achievements[0].id);
        }

        it "hides drafts from the foundation until submitted" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let report = db.save_report(&ctx, report_input(&["Upacara"])).unwrap();
            let reviewer = foundation();

            assert!(db.fetch_reports(&reviewer).unwrap().is_empty());
            assert!(db.get_report(&reviewer, report.id).unwrap().is_none());

            let mut loaded = db.get_report(&ctx, report.id).unwrap().unwrap();
            workflow::submit_report(&ctx, &mut loaded, Utc::now()).unwrap();
            db.persist_report_transition(&loaded).unwrap();

            let visible = db.fetch_reports(&reviewer).unwrap();
            assert_eq!(visible.len(), 1);
            assert_eq!(visible[0].status, ReportStatus::Submitted);
        }

        it "scopes principals to their own reports while admin sees all" {
            let db = setup_db();
            let sari = sign_up_principal(&db, "sari");
            let budi = sign_up_principal(&db, "budi");
            db.save_report(&sari, report_input(&["Upacara"])).unwrap();
            db.save_report(&budi, report_input(&["Rapat"])).unwrap();

            assert_eq!(db.fetch_reports(&sari).unwrap().len(), 1);
            assert_eq!(db.fetch_reports(&budi).unwrap().len(), 1);
            assert_eq!(db.fetch_reports(&admin()).unwrap().len(), 2);
        }

        it "round-trips an approval through the database" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let report = db.save_report(&ctx, report_input(&["Upacara"])).unwrap();

            let mut loaded = db.get_report(&ctx, report.id).unwrap().unwrap();
            workflow::submit_report(&ctx, &mut loaded, Utc::now()).unwrap();
            db.persist_report_transition(&loaded).unwrap();

            let reviewer = foundation();
            let mut submitted = db.get_report(&reviewer, report.id).unwrap().unwrap();
            workflow::approve_report(
                &reviewer,
                &mut submitted,
                ApproveReportInput {
                    foundation_evaluation: full_evaluation(),
                    foundation_comment: Some("Bagus".into()),
                },
            )
            .unwrap();
            db.persist_report_transition(&submitted).unwrap();

            let stored = db.get_report(&ctx, report.id).unwrap().unwrap();
            assert_eq!(stored.status, ReportStatus::Approved);
            assert_eq!(stored.foundation_evaluation.len(), EvaluationItem::ALL.len());
            assert_eq!(stored.foundation_comment.as_deref(), Some("Bagus"));
        }

        it "refuses deletes by a non-owning principal" {
            let db = setup_db();
            let sari = sign_up_principal(&db, "sari");
            let budi = sign_up_principal(&db, "budi");
            let report = db.save_report(&sari, report_input(&["Upacara"])).unwrap();

            assert!(matches!(
                db.delete_report(&budi, report.id),
                Err(StoreError::Forbidden)
            ));
            db.delete_report(&sari, report.id).unwrap();
            assert!(db.get_report(&sari, report.id).unwrap().is_none());
        }

        it "publishes change events for save and delete" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let mut rx = db.subscribe_reports();

            let report = db.save_report(&ctx, report_input(&["Upacara"])).unwrap();
            let event = rx.try_recv().unwrap();
            assert_eq!(event.op, ChangeOp::Insert);
            assert_eq!(event.report_id, report.id);

            db.delete_report(&ctx, report.id).unwrap();
            let event = rx.try_recv().unwrap();
            assert_eq!(event.op, ChangeOp::Delete);
        }
    }

    describe "budget plan gateway" {
        it "stores both expense kinds and keeps their split" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");

            let rab = db.save_rab(&ctx, rab_input()).unwrap();

            assert_eq!(rab.routine_expenses.len(), 1);
            assert_eq!(rab.incidental_expenses.len(), 1);
            assert_eq!(rab.total_amount(), 200_000);
        }

        it "hides drafts from the foundation" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let rab = db.save_rab(&ctx, rab_input()).unwrap();
            let reviewer = foundation();

            assert!(db.fetch_rabs(&reviewer).unwrap().is_empty());

            let mut loaded = db.get_rab(&ctx, rab.id).unwrap().unwrap();
            workflow::submit_rab(&ctx, &mut loaded, Utc::now()).unwrap();
            db.persist_rab_transition(&loaded).unwrap();

            assert_eq!(db.fetch_rabs(&reviewer).unwrap().len(), 1);
        }

        it "blocks edits to a submitted plan" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let rab = db.save_rab(&ctx, rab_input()).unwrap();

            let mut loaded = db.get_rab(&ctx, rab.id).unwrap().unwrap();
            workflow::submit_rab(&ctx, &mut loaded, Utc::now()).unwrap();
            db.persist_rab_transition(&loaded).unwrap();

            let mut input = rab_input();
            input.id = RecordId::from(rab.id);
            assert!(matches!(db.save_rab(&ctx, input), Err(StoreError::Forbidden)));
        }

        it "blocks deleting an approved plan but allows a rejected one" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let reviewer = foundation();

            let approved = db.save_rab(&ctx, rab_input()).unwrap();
            let mut loaded = db.get_rab(&ctx, approved.id).unwrap().unwrap();
            workflow::submit_rab(&ctx, &mut loaded, Utc::now()).unwrap();
            db.persist_rab_transition(&loaded).unwrap();
            let mut loaded = db.get_rab(&ctx, approved.id).unwrap().unwrap();
            workflow::approve_rab(
                &reviewer,
                &mut loaded,
                ReviewRabInput { review_comment: None },
                Utc::now(),
            )
            .unwrap();
            db.persist_rab_transition(&loaded).unwrap();

            assert!(matches!(
                db.delete_rab(&ctx, approved.id),
                Err(StoreError::Forbidden)
            ));

            let rejected = db.save_rab(&ctx, rab_input()).unwrap();
            let mut loaded = db.get_rab(&ctx, rejected.id).unwrap().unwrap();
            workflow::submit_rab(&ctx, &mut loaded, Utc::now()).unwrap();
            db.persist_rab_transition(&loaded).unwrap();
            let mut loaded = db.get_rab(&ctx, rejected.id).unwrap().unwrap();
            workflow::reject_rab(
                &reviewer,
                &mut loaded,
                ReviewRabInput { review_comment: Some("Revisi".into()) },
                Utc::now(),
            )
            .unwrap();
            db.persist_rab_transition(&loaded).unwrap();

            db.delete_rab(&ctx, rejected.id).unwrap();
            assert!(db.get_rab(&ctx, rejected.id).unwrap().is_none());
        }
    }

    describe "realization gateway" {
        fn approved_rab(db: &Database, ctx: &SessionContext) -> Uuid {
            let rab = db.save_rab(ctx, rab_input()).unwrap();
            let mut loaded = db.get_rab(ctx, rab.id).unwrap().unwrap();
            workflow::submit_rab(ctx, &mut loaded, Utc::now()).unwrap();
            db.persist_rab_transition(&loaded).unwrap();
            let mut loaded = db.get_rab(ctx, rab.id).unwrap().unwrap();
            workflow::approve_rab(
                &SessionContext::new(Uuid::new_v4(), Role::Foundation),
                &mut loaded,
                ReviewRabInput { review_comment: None },
                Utc::now(),
            )
            .unwrap();
            db.persist_rab_transition(&loaded).unwrap();
            rab.id
        }

        it "copies the plan's items with actuals at zero" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let rab_id = approved_rab(&db, &ctx);

            let realization = db.create_realization(&ctx, rab_id).unwrap();

            assert_eq!(realization.realization_items.len(), 2);
            assert_eq!(realization.total_planned(), 200_000);
            assert_eq!(realization.total_actual(), 0);
            assert_eq!(realization.user_id, ctx.user_id);
        }

        it "refuses creation from an unapproved plan" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let rab = db.save_rab(&ctx, rab_input()).unwrap();

            assert!(matches!(
                db.create_realization(&ctx, rab.id),
                Err(StoreError::Forbidden)
            ));
        }

        it "updates actuals and notes on persisted items" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let rab_id = approved_rab(&db, &ctx);
            let realization = db.create_realization(&ctx, rab_id).unwrap();

            let input = SaveRealizationItemsInput {
                realization_items: realization
                    .realization_items
                    .iter()
                    .map(|item| RealizationItemInput {
                        id: RecordId::from(item.id),
                        expense_item_id: item.expense_item_id,
                        actual_amount: item.planned_amount - 10_000,
                        notes: Some("sebagian".into()),
                    })
                    .collect(),
            };

            let updated = db.save_realization_items(&ctx, realization.id, input).unwrap();
            assert_eq!(updated.total_actual(), 180_000);
            assert_eq!(updated.variance(), 20_000);
            assert!(updated.realization_items.iter().all(|i| i.notes.is_some()));
        }

        it "rejects new items that do not point at a plan expense" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let rab_id = approved_rab(&db, &ctx);
            let realization = db.create_realization(&ctx, rab_id).unwrap();

            let input = SaveRealizationItemsInput {
                realization_items: vec![RealizationItemInput {
                    id: RecordId::Pending("tmp-item".into()),
                    expense_item_id: Uuid::new_v4(),
                    actual_amount: 1_000,
                    notes: None,
                }],
            };

            assert!(matches!(
                db.save_realization_items(&ctx, realization.id, input),
                Err(StoreError::NotFound(_))
            ));
        }

        it "hides in-progress realizations from the foundation" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let rab_id = approved_rab(&db, &ctx);
            let realization = db.create_realization(&ctx, rab_id).unwrap();
            let reviewer = foundation();

            assert!(db.fetch_realizations(&reviewer).unwrap().is_empty());

            let mut loaded = db.get_realization(&ctx, realization.id).unwrap().unwrap();
            workflow::submit_realization(&ctx, &mut loaded).unwrap();
            db.persist_realization_transition(&loaded).unwrap();

            assert_eq!(db.fetch_realizations(&reviewer).unwrap().len(), 1);
        }
    }

    describe "memo gateway" {
        fn memo_input() -> SaveMemoInput {
            SaveMemoInput {
                id: RecordId::Pending("tmp-memo".into()),
                memo_number: "001/MEMO/2025".into(),
                subject: "Rapat koordinasi".into(),
                date: NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
                tables: vec![MemoTableInput {
                    id: RecordId::Pending("tmp-table".into()),
                    title: Some("Peserta".into()),
                    headers: vec!["Nama".into(), "Jabatan".into()],
                    rows: vec![vec!["Sari".into(), "Kepala Sekolah".into()]],
                }],
            }
        }

        it "round-trips tables with headers and rows" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");

            let memo = db.save_memo(&ctx, memo_input()).unwrap();

            assert_eq!(memo.tables.len(), 1);
            assert_eq!(memo.tables[0].headers, vec!["Nama".to_string(), "Jabatan".to_string()]);
            assert_eq!(memo.tables[0].rows[0][0], "Sari");
        }

        it "only shows the foundation memos that were sent to it" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let memo = db.save_memo(&ctx, memo_input()).unwrap();
            let reviewer = foundation();

            assert!(db.fetch_memos(&reviewer).unwrap().is_empty());

            let mut loaded = db.get_memo(&ctx, memo.id).unwrap().unwrap();
            workflow::send_memo_to_foundation(&ctx, &mut loaded).unwrap();
            db.persist_memo_transition(&loaded).unwrap();

            assert_eq!(db.fetch_memos(&reviewer).unwrap().len(), 1);
        }

        it "persists a duplicate as an independent draft" {
            let db = setup_db();
            let ctx = sign_up_principal(&db, "sari");
            let memo = db.save_memo(&ctx, memo_input()).unwrap();
            let mut loaded = db.get_memo(&ctx, memo.id).unwrap().unwrap();
            workflow::send_memo_to_foundation(&ctx, &mut loaded).unwrap();
            db.persist_memo_transition(&loaded).unwrap();

            let today = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
            let copy = workflow::duplicate_memo(&ctx, &loaded, today).unwrap();
            db.insert_duplicated_memo(&copy).unwrap();

            let stored = db.get_memo(&ctx, copy.id).unwrap().unwrap();
            assert_eq!(stored.status, sekolah_admin::models::MemoStatus::Draft);
            assert_eq!(stored.date, today);
            assert_eq!(stored.tables.len(), 1);

            // Deleting the copy leaves the original untouched.
            db.delete_memo(&ctx, copy.id).unwrap();
            assert!(db.get_memo(&ctx, memo.id).unwrap().is_some());
        }
    }

    describe "profile gateway" {
        it "lets only admin list and re-role profiles" {
            let db = setup_db();
            let sari = sign_up_principal(&db, "sari");
            sign_up_principal(&db, "budi");

            assert!(matches!(db.list_profiles(&sari), Err(StoreError::Forbidden)));
            assert_eq!(db.list_profiles(&admin()).unwrap().len(), 2);

            let err = db
                .update_profile(
                    &sari,
                    sari.user_id,
                    UpdateProfileInput { full_name: None, role: Some(Role::Admin) },
                )
                .unwrap_err();
            assert!(matches!(err, StoreError::Forbidden));

            let updated = db
                .update_profile(
                    &admin(),
                    sari.user_id,
                    UpdateProfileInput { full_name: None, role: Some(Role::Foundation) },
                )
                .unwrap();
            assert_eq!(updated.role, Role::Foundation);
        }

        it "lets a user rename themselves" {
            let db = setup_db();
            let sari = sign_up_principal(&db, "sari");

            let updated = db
                .update_profile(
                    &sari,
                    sari.user_id,
                    UpdateProfileInput { full_name: Some("Sari Dewi".into()), role: None },
                )
                .unwrap();
            assert_eq!(updated.full_name, "Sari Dewi");
        }
    }
}

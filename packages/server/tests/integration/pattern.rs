use serde_json::json;

use crate::common::{TestApp, pattern_body, routes};

mod create {
    use super::*;

    #[tokio::test]
    async fn creates_pattern_owned_by_caller_with_empty_slots() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("maker@example.com", "password123")
            .await;
        let me = app.get_with_token(routes::ME, &token).await.id();

        let res = app
            .post_with_token(routes::PATTERNS, &pattern_body("Wrap dress"), &token)
            .await;

        assert_eq!(res.status, 201, "create failed: {}", res.text);
        assert_eq!(res.body["title"], "Wrap dress");
        assert_eq!(res.body["brand"], "Fibre Mood");
        assert_eq!(res.body["owner_id"], me.to_string());
        assert!(res.body["pattern_a0_file_id"].is_null());
        assert!(res.body["icon"].is_null());
        assert_eq!(res.body["created_at"], res.body["updated_at"]);
    }

    #[tokio::test]
    async fn rejects_out_of_range_difficulty() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("maker@example.com", "password123")
            .await;
        let mut body = pattern_body("Too hard");
        body["difficulty"] = json!(6);

        let res = app.post_with_token(routes::PATTERNS, &body, &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn rejects_negative_fabric_amount() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("maker@example.com", "password123")
            .await;
        let mut body = pattern_body("Negative");
        body["fabric_amount"] = json!(-1.0);

        let res = app.post_with_token(routes::PATTERNS, &body, &token).await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn rejects_unknown_brand() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("maker@example.com", "password123")
            .await;
        let mut body = pattern_body("Knock-off");
        body["brand"] = json!("Nobody");

        let res = app.post_with_token(routes::PATTERNS, &body, &token).await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::PATTERNS, &pattern_body("Anonymous"))
            .await;

        assert_eq!(res.status, 401);
    }
}

mod read {
    use super::*;

    #[tokio::test]
    async fn owner_reads_pattern() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("maker@example.com", "password123")
            .await;
        let id = app.create_pattern(&token, "Shirt").await;

        let res = app.get_with_token(&routes::pattern(id), &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.id(), id);
    }

    #[tokio::test]
    async fn other_user_is_denied_but_superuser_allowed() {
        let app = TestApp::spawn().await;
        let owner = app
            .create_authenticated_user("owner@example.com", "password123")
            .await;
        let other = app
            .create_authenticated_user("other@example.com", "password123")
            .await;
        let admin = app.superuser_token().await;
        let id = app.create_pattern(&owner, "Private").await;

        let denied = app.get_with_token(&routes::pattern(id), &other).await;
        let allowed = app.get_with_token(&routes::pattern(id), &admin).await;

        assert_eq!(denied.status, 403);
        assert_eq!(allowed.status, 200);
    }

    #[tokio::test]
    async fn unknown_pattern_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("maker@example.com", "password123")
            .await;

        let res = app
            .get_with_token(&routes::pattern(uuid::Uuid::new_v4()), &token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod list {
    use super::*;

    #[tokio::test]
    async fn filters_match_exactly_and_count_ignores_paging() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("maker@example.com", "password123")
            .await;
        for title in ["One", "Two", "Three"] {
            app.create_pattern(&token, title).await;
        }
        let mut seamwork = pattern_body("Seamwork jacket");
        seamwork["brand"] = json!("Seamwork");
        seamwork["category"] = json!("Jackets");
        let res = app.post_with_token(routes::PATTERNS, &seamwork, &token).await;
        assert_eq!(res.status, 201);

        let all = app
            .get_with_token(&format!("{}?limit=2", routes::PATTERNS), &token)
            .await;
        let by_brand = app
            .get_with_token(&format!("{}?brand=Seamwork", routes::PATTERNS), &token)
            .await;
        let by_title = app
            .get_with_token(&format!("{}?title=Two", routes::PATTERNS), &token)
            .await;

        assert_eq!(all.status, 200, "list failed: {}", all.text);
        assert_eq!(all.body["count"], 4);
        assert_eq!(all.body["data"].as_array().unwrap().len(), 2);
        assert_eq!(by_brand.body["count"], 1);
        assert_eq!(by_brand.body["data"][0]["title"], "Seamwork jacket");
        assert_eq!(by_title.body["count"], 1);
    }

    #[tokio::test]
    async fn most_recently_updated_first() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("maker@example.com", "password123")
            .await;
        let first = app.create_pattern(&token, "First").await;
        app.create_pattern(&token, "Second").await;

        let res = app
            .put_with_token(&routes::pattern(first), &json!({"fabric": "Linen"}), &token)
            .await;
        assert_eq!(res.status, 200);

        let res = app.get_with_token(routes::PATTERNS, &token).await;
        assert_eq!(res.body["data"][0]["title"], "First");
    }

    #[tokio::test]
    async fn self_patterns_limits_to_callers_patterns() {
        let app = TestApp::spawn().await;
        let alice = app
            .create_authenticated_user("alice@example.com", "password123")
            .await;
        let bob = app
            .create_authenticated_user("bob@example.com", "password123")
            .await;
        app.create_pattern(&alice, "Alice's").await;
        app.create_pattern(&bob, "Bob's").await;

        let everyone = app.get_with_token(routes::PATTERNS, &alice).await;
        let own = app
            .get_with_token(&format!("{}?self_patterns=true", routes::PATTERNS), &alice)
            .await;

        assert_eq!(everyone.body["count"], 2);
        assert_eq!(own.body["count"], 1);
        assert_eq!(own.body["data"][0]["title"], "Alice's");
    }

    #[tokio::test]
    async fn invalid_filter_value_fails_validation() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("maker@example.com", "password123")
            .await;

        let res = app
            .get_with_token(&format!("{}?difficulty=hard", routes::PATTERNS), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn updates_present_fields_and_clears_explicit_nulls() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("maker@example.com", "password123")
            .await;
        let id = app.create_pattern(&token, "Before").await;

        let res = app
            .put_with_token(
                &routes::pattern(id),
                &json!({"title": "After", "fabric": null, "difficulty": 5}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "update failed: {}", res.text);
        assert_eq!(res.body["title"], "After");
        assert!(res.body["fabric"].is_null());
        assert_eq!(res.body["difficulty"], 5);
        assert_eq!(res.body["brand"], "Fibre Mood");
        assert_ne!(res.body["updated_at"], res.body["created_at"]);
    }

    #[tokio::test]
    async fn non_owner_cannot_update() {
        let app = TestApp::spawn().await;
        let owner = app
            .create_authenticated_user("owner@example.com", "password123")
            .await;
        let other = app
            .create_authenticated_user("other@example.com", "password123")
            .await;
        let id = app.create_pattern(&owner, "Mine").await;

        let res = app
            .put_with_token(&routes::pattern(id), &json!({"title": "Yours"}), &other)
            .await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn empty_title_fails_validation() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("maker@example.com", "password123")
            .await;
        let id = app.create_pattern(&token, "Titled").await;

        let res = app
            .put_with_token(&routes::pattern(id), &json!({"title": "  "}), &token)
            .await;

        assert_eq!(res.status, 400);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn owner_deletes_pattern() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("maker@example.com", "password123")
            .await;
        let id = app.create_pattern(&token, "Short-lived").await;

        let res = app.delete_with_token(&routes::pattern(id), &token).await;

        assert_eq!(res.status, 200, "delete failed: {}", res.text);
        assert_eq!(res.body["message"], "Pattern deleted successfully");
        let res = app.get_with_token(&routes::pattern(id), &token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn non_owner_cannot_delete() {
        let app = TestApp::spawn().await;
        let owner = app
            .create_authenticated_user("owner@example.com", "password123")
            .await;
        let other = app
            .create_authenticated_user("other@example.com", "password123")
            .await;
        let id = app.create_pattern(&owner, "Keep").await;

        let res = app.delete_with_token(&routes::pattern(id), &other).await;

        assert_eq!(res.status, 403);
        let res = app.get_with_token(&routes::pattern(id), &owner).await;
        assert_eq!(res.status, 200);
    }
}

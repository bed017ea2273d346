use std::sync::Mutex;

use anyhow::Result;
use chrono::Utc;
use mockall::predicate::eq;
use quill::domain::repositories::{
    subscriptions::MockSubscriptionRepository, users::MockUserRepository,
};
use serde_json::json;

use super::*;
use crate::usecases::{
    identity::tests::{auth_user, known_user_repo, user_entity},
    premium_access::tests::subscription_entity,
};

/// Subscription table fake with the repository's "latest row wins" semantics.
#[derive(Default)]
struct InMemorySubscriptions {
    rows: Mutex<Vec<SubscriptionEntity>>,
}

impl InMemorySubscriptions {
    fn seeded(rows: Vec<SubscriptionEntity>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    fn rows_for(&self, user_id: i64) -> Vec<SubscriptionEntity> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptions {
    async fn find_latest_by_user_id(&self, user_id: i64) -> Result<Option<SubscriptionEntity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.user_id == user_id)
            .max_by_key(|row| row.id)
            .cloned())
    }

    async fn find_by_external_subscription_id(
        &self,
        external_subscription_id: String,
    ) -> Result<Option<SubscriptionEntity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.external_subscription_id.as_deref() == Some(&external_subscription_id))
            .max_by_key(|row| row.id)
            .cloned())
    }

    async fn upsert_for_user(
        &self,
        insert: InsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();

        let latest = rows
            .iter_mut()
            .filter(|row| row.user_id == insert.user_id)
            .max_by_key(|row| row.id);

        if let Some(row) = latest {
            row.external_customer_id = insert.external_customer_id;
            row.external_subscription_id = insert.external_subscription_id;
            row.status = insert.status;
            row.plan = insert.plan;
            row.current_period_end = insert.current_period_end;
            row.updated_at = now;
            return Ok(row.clone());
        }

        let row = SubscriptionEntity {
            id: rows.iter().map(|row| row.id).max().unwrap_or(0) + 1,
            user_id: insert.user_id,
            external_customer_id: insert.external_customer_id,
            external_subscription_id: insert.external_subscription_id,
            status: insert.status,
            plan: insert.plan,
            current_period_end: insert.current_period_end,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn update_status_for_user(
        &self,
        user_id: i64,
        status: SubscriptionStatus,
    ) -> Result<Option<SubscriptionEntity>> {
        let mut rows = self.rows.lock().unwrap();
        let latest = rows
            .iter_mut()
            .filter(|row| row.user_id == user_id)
            .max_by_key(|row| row.id);

        Ok(latest.map(|row| {
            row.status = status.to_string();
            row.updated_at = Utc::now();
            row.clone()
        }))
    }
}

fn user_repo_with_ids(ids: &'static [i64]) -> MockUserRepository {
    let mut user_repo = MockUserRepository::new();
    user_repo.expect_find_by_id().returning(move |user_id| {
        let user = ids
            .contains(&user_id)
            .then(|| user_entity(user_id, &format!("auth0|{user_id}")));
        Box::pin(async move { Ok(user) })
    });
    user_repo
}

fn event(type_: &str, object: serde_json::Value) -> StripeEvent {
    serde_json::from_value(json!({
        "id": "evt_1",
        "type": type_,
        "created": 1_700_000_000,
        "data": { "object": object }
    }))
    .unwrap()
}

fn stripe_subscription(id: &str, status: &str, user_id: Option<&str>, interval: &str) -> serde_json::Value {
    let metadata = match user_id {
        Some(user_id) => json!({ "userId": user_id }),
        None => json!({}),
    };
    json!({
        "id": id,
        "customer": "cus_1",
        "status": status,
        "metadata": metadata,
        "current_period_end": 1_800_000_000,
        "items": { "data": [ { "price": { "recurring": { "interval": interval } } } ] }
    })
}

fn gateway_verifying(event: StripeEvent) -> MockStripeGateway {
    let mut stripe = MockStripeGateway::new();
    stripe
        .expect_verify_webhook_signature()
        .returning(move |_, _| Ok(event.clone()));
    stripe
}

fn checkout_request() -> CreateCheckoutRequest {
    CreateCheckoutRequest {
        price_id: Some("price_monthly".to_string()),
        success_url: Some("https://app.example.com/success".to_string()),
        cancel_url: Some("https://app.example.com/cancel".to_string()),
    }
}

#[tokio::test]
async fn billing_endpoints_answer_unavailable_without_stripe() {
    let usecase: SubscriptionUseCase<MockSubscriptionRepository, MockUserRepository, MockStripeGateway> =
        SubscriptionUseCase::new(
            Arc::new(MockSubscriptionRepository::new()),
            Arc::new(MockUserRepository::new()),
            None,
        );

    let checkout = usecase
        .create_checkout_session(&auth_user("auth0|u", None), checkout_request())
        .await;
    assert!(matches!(checkout, Err(SubscriptionError::NotConfigured)));

    let webhook = usecase.handle_webhook(b"{}", Some("t=1,v1=00")).await;
    let err = webhook.unwrap_err();
    assert_eq!(err.status_code().as_u16(), 503);
    assert!(matches!(AppError::from(err), AppError::ServiceUnavailable(_)));
}

#[tokio::test]
async fn checkout_is_refused_when_already_active() {
    let subscriptions = InMemorySubscriptions::seeded(vec![subscription_entity(
        1,
        SubscriptionStatus::Active,
        Some(SubscriptionPlan::Monthly),
    )]);
    let mut stripe = MockStripeGateway::new();
    stripe.expect_create_checkout_session().times(0);

    let usecase = SubscriptionUseCase::new(
        Arc::new(subscriptions),
        Arc::new(known_user_repo("auth0|u", 1)),
        Some(Arc::new(stripe)),
    );

    let result = usecase
        .create_checkout_session(&auth_user("auth0|u", None), checkout_request())
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, SubscriptionError::AlreadyActive));
    assert_eq!(err.status_code().as_u16(), 400);
}

#[tokio::test]
async fn checkout_creates_customer_for_first_time_subscriber() {
    let mut stripe = MockStripeGateway::new();
    stripe
        .expect_create_customer()
        .withf(|email, _, user_id| email == "auth0|u@example.com" && *user_id == 1)
        .times(1)
        .returning(|_, _, _| Ok("cus_new".to_string()));
    stripe
        .expect_create_checkout_session()
        .withf(|params| {
            params.customer_id == "cus_new"
                && params.price_id == "price_monthly"
                && params.user_id == 1
        })
        .times(1)
        .returning(|_| {
            Ok(StripeCheckoutSession {
                id: "cs_1".to_string(),
                url: Some("https://checkout.stripe.com/c/cs_1".to_string()),
            })
        });

    let usecase = SubscriptionUseCase::new(
        Arc::new(InMemorySubscriptions::default()),
        Arc::new(known_user_repo("auth0|u", 1)),
        Some(Arc::new(stripe)),
    );

    let response = usecase
        .create_checkout_session(&auth_user("auth0|u", None), checkout_request())
        .await
        .unwrap();

    assert_eq!(response.session_id, "cs_1");
    assert_eq!(response.url, "https://checkout.stripe.com/c/cs_1");
}

#[tokio::test]
async fn checkout_reuses_known_customer_after_cancellation() {
    let subscriptions = InMemorySubscriptions::seeded(vec![subscription_entity(
        1,
        SubscriptionStatus::Canceled,
        Some(SubscriptionPlan::Monthly),
    )]);
    let mut stripe = MockStripeGateway::new();
    stripe.expect_create_customer().times(0);
    stripe
        .expect_create_checkout_session()
        .withf(|params| params.customer_id == "cus_1")
        .returning(|_| {
            Ok(StripeCheckoutSession {
                id: "cs_2".to_string(),
                url: Some("https://checkout.stripe.com/c/cs_2".to_string()),
            })
        });

    let usecase = SubscriptionUseCase::new(
        Arc::new(subscriptions),
        Arc::new(known_user_repo("auth0|u", 1)),
        Some(Arc::new(stripe)),
    );

    let response = usecase
        .create_checkout_session(&auth_user("auth0|u", None), checkout_request())
        .await
        .unwrap();

    assert_eq!(response.session_id, "cs_2");
}

#[tokio::test]
async fn checkout_rejects_relative_urls() {
    let usecase = SubscriptionUseCase::new(
        Arc::new(InMemorySubscriptions::default()),
        Arc::new(MockUserRepository::new()),
        Some(Arc::new(MockStripeGateway::new())),
    );

    let result = usecase
        .create_checkout_session(
            &auth_user("auth0|u", None),
            CreateCheckoutRequest {
                success_url: Some("/success".to_string()),
                ..checkout_request()
            },
        )
        .await;

    assert!(matches!(result, Err(SubscriptionError::InvalidRequest(_))));
}

#[tokio::test]
async fn portal_requires_known_customer() {
    let usecase = SubscriptionUseCase::new(
        Arc::new(InMemorySubscriptions::default()),
        Arc::new(known_user_repo("auth0|u", 1)),
        Some(Arc::new(MockStripeGateway::new())),
    );

    let result = usecase
        .create_portal_session(
            &auth_user("auth0|u", None),
            CreatePortalRequest {
                return_url: Some("https://app.example.com/account".to_string()),
            },
        )
        .await;

    assert!(matches!(result, Err(SubscriptionError::SubscriptionNotFound)));
}

#[tokio::test]
async fn failed_provider_cancel_leaves_row_untouched() {
    let subscriptions = Arc::new(InMemorySubscriptions::seeded(vec![subscription_entity(
        1,
        SubscriptionStatus::Active,
        Some(SubscriptionPlan::Yearly),
    )]));
    let mut stripe = MockStripeGateway::new();
    stripe
        .expect_cancel_subscription()
        .with(eq("sub_1".to_string()))
        .returning(|_| Err(anyhow!("stripe unavailable")));

    let usecase = SubscriptionUseCase::new(
        Arc::clone(&subscriptions),
        Arc::new(known_user_repo("auth0|u", 1)),
        Some(Arc::new(stripe)),
    );

    let result = usecase.cancel(&auth_user("auth0|u", None)).await;

    assert!(matches!(result, Err(SubscriptionError::Internal(_))));
    assert_eq!(subscriptions.rows_for(1)[0].status, "active");
}

#[tokio::test]
async fn successful_cancel_marks_row_canceled() {
    let subscriptions = Arc::new(InMemorySubscriptions::seeded(vec![subscription_entity(
        1,
        SubscriptionStatus::Active,
        Some(SubscriptionPlan::Yearly),
    )]));
    let mut stripe = MockStripeGateway::new();
    stripe
        .expect_cancel_subscription()
        .times(1)
        .returning(|_| Ok(()));

    let usecase = SubscriptionUseCase::new(
        Arc::clone(&subscriptions),
        Arc::new(known_user_repo("auth0|u", 1)),
        Some(Arc::new(stripe)),
    );

    usecase.cancel(&auth_user("auth0|u", None)).await.unwrap();

    let rows = subscriptions.rows_for(1);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, "canceled");
    assert_eq!(rows[0].plan.as_deref(), Some("yearly"));
}

#[tokio::test]
async fn cancel_without_subscription_is_not_found() {
    let mut stripe = MockStripeGateway::new();
    stripe.expect_cancel_subscription().times(0);

    let usecase = SubscriptionUseCase::new(
        Arc::new(InMemorySubscriptions::default()),
        Arc::new(known_user_repo("auth0|u", 1)),
        Some(Arc::new(stripe)),
    );

    let result = usecase.cancel(&auth_user("auth0|u", None)).await;

    assert!(matches!(result, Err(SubscriptionError::SubscriptionNotFound)));
}

#[tokio::test]
async fn status_reports_none_without_row() {
    let usecase: SubscriptionUseCase<_, _, MockStripeGateway> = SubscriptionUseCase::new(
        Arc::new(InMemorySubscriptions::default()),
        Arc::new(known_user_repo("auth0|u", 1)),
        None,
    );

    let status = usecase.status(&auth_user("auth0|u", None)).await.unwrap();
    assert_eq!(status.status, "none");
    assert!(!status.has_subscription);

    let access = usecase
        .premium_access(&auth_user("auth0|u", None))
        .await
        .unwrap();
    assert!(!access.has_access);
}

#[tokio::test]
async fn invalid_signature_is_rejected_before_any_write() {
    let mut subscriptions = MockSubscriptionRepository::new();
    subscriptions.expect_upsert_for_user().times(0);
    subscriptions.expect_update_status_for_user().times(0);
    let mut stripe = MockStripeGateway::new();
    stripe
        .expect_verify_webhook_signature()
        .returning(|_, _| Err(anyhow!("invalid webhook signature")));

    let usecase = SubscriptionUseCase::new(
        Arc::new(subscriptions),
        Arc::new(MockUserRepository::new()),
        Some(Arc::new(stripe)),
    );

    let result = usecase.handle_webhook(b"{}", Some("t=1,v1=00")).await;
    assert!(matches!(result, Err(SubscriptionError::InvalidWebhook(_))));

    let missing = usecase.handle_webhook(b"{}", None).await;
    assert!(matches!(missing, Err(SubscriptionError::InvalidWebhook(_))));
}

#[tokio::test]
async fn replayed_subscription_update_yields_single_row() {
    let subscriptions = Arc::new(InMemorySubscriptions::default());
    let stripe = gateway_verifying(event(
        "customer.subscription.updated",
        stripe_subscription("sub_9", "active", Some("5"), "year"),
    ));

    let usecase = SubscriptionUseCase::new(
        Arc::clone(&subscriptions),
        Arc::new(user_repo_with_ids(&[5])),
        Some(Arc::new(stripe)),
    );

    for _ in 0..2 {
        let ack = usecase
            .handle_webhook(b"payload", Some("t=1,v1=00"))
            .await
            .unwrap();
        assert!(ack.received);
    }

    let rows = subscriptions.rows_for(5);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, "active");
    assert_eq!(rows[0].plan.as_deref(), Some("yearly"));
    assert_eq!(rows[0].external_subscription_id.as_deref(), Some("sub_9"));
    assert_eq!(
        rows[0].current_period_end.map(|ts| ts.timestamp()),
        Some(1_800_000_000)
    );
}

#[tokio::test]
async fn trialing_subscription_maps_to_inactive_trial() {
    let subscriptions = Arc::new(InMemorySubscriptions::default());
    let stripe = gateway_verifying(event(
        "customer.subscription.created",
        stripe_subscription("sub_3", "trialing", Some("5"), "month"),
    ));

    let usecase = SubscriptionUseCase::new(
        Arc::clone(&subscriptions),
        Arc::new(user_repo_with_ids(&[5])),
        Some(Arc::new(stripe)),
    );

    usecase
        .handle_webhook(b"payload", Some("t=1,v1=00"))
        .await
        .unwrap();

    let row = &subscriptions.rows_for(5)[0];
    assert_eq!(row.status, "inactive");
    assert_eq!(row.plan.as_deref(), Some("trial"));
}

#[tokio::test]
async fn subscription_event_without_user_metadata_is_acknowledged() {
    let mut subscriptions = MockSubscriptionRepository::new();
    subscriptions.expect_upsert_for_user().times(0);
    let stripe = gateway_verifying(event(
        "customer.subscription.updated",
        stripe_subscription("sub_9", "active", Some("not-a-number"), "month"),
    ));

    let usecase = SubscriptionUseCase::new(
        Arc::new(subscriptions),
        Arc::new(MockUserRepository::new()),
        Some(Arc::new(stripe)),
    );

    let ack = usecase
        .handle_webhook(b"payload", Some("t=1,v1=00"))
        .await
        .unwrap();
    assert!(ack.received);
}

#[tokio::test]
async fn subscription_event_for_unknown_user_is_dropped() {
    let subscriptions = Arc::new(InMemorySubscriptions::default());
    let stripe = gateway_verifying(event(
        "customer.subscription.created",
        stripe_subscription("sub_9", "active", Some("77"), "month"),
    ));

    let usecase = SubscriptionUseCase::new(
        Arc::clone(&subscriptions),
        Arc::new(user_repo_with_ids(&[5])),
        Some(Arc::new(stripe)),
    );

    usecase
        .handle_webhook(b"payload", Some("t=1,v1=00"))
        .await
        .unwrap();

    assert!(subscriptions.rows_for(77).is_empty());
}

#[tokio::test]
async fn deleted_subscription_marks_owner_canceled() {
    let subscriptions = Arc::new(InMemorySubscriptions::seeded(vec![subscription_entity(
        1,
        SubscriptionStatus::Active,
        Some(SubscriptionPlan::Monthly),
    )]));
    let stripe = gateway_verifying(event(
        "customer.subscription.deleted",
        stripe_subscription("sub_1", "canceled", None, "month"),
    ));

    let usecase = SubscriptionUseCase::new(
        Arc::clone(&subscriptions),
        Arc::new(MockUserRepository::new()),
        Some(Arc::new(stripe)),
    );

    usecase
        .handle_webhook(b"payload", Some("t=1,v1=00"))
        .await
        .unwrap();

    assert_eq!(subscriptions.rows_for(1)[0].status, "canceled");
}

#[tokio::test]
async fn failed_invoice_moves_active_row_to_past_due_keeping_plan() {
    let subscriptions = Arc::new(InMemorySubscriptions::seeded(vec![subscription_entity(
        1,
        SubscriptionStatus::Active,
        Some(SubscriptionPlan::Yearly),
    )]));
    let mut stripe = gateway_verifying(event(
        "invoice.payment_failed",
        json!({ "id": "in_1", "subscription": "sub_1" }),
    ));
    stripe
        .expect_retrieve_subscription()
        .with(eq("sub_1".to_string()))
        .returning(|_| {
            Ok(serde_json::from_value(stripe_subscription("sub_1", "past_due", Some("1"), "year"))
                .unwrap())
        });

    let usecase = SubscriptionUseCase::new(
        Arc::clone(&subscriptions),
        Arc::new(MockUserRepository::new()),
        Some(Arc::new(stripe)),
    );

    usecase
        .handle_webhook(b"payload", Some("t=1,v1=00"))
        .await
        .unwrap();

    let rows = subscriptions.rows_for(1);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, "past_due");
    assert_eq!(rows[0].plan.as_deref(), Some("yearly"));
}

#[tokio::test]
async fn paid_invoice_falls_back_to_local_owner_lookup() {
    let subscriptions = Arc::new(InMemorySubscriptions::seeded(vec![subscription_entity(
        1,
        SubscriptionStatus::PastDue,
        Some(SubscriptionPlan::Monthly),
    )]));
    let mut stripe = gateway_verifying(event(
        "invoice.payment_succeeded",
        json!({
            "id": "in_2",
            "parent": { "subscription_details": { "subscription": "sub_1" } }
        }),
    ));
    stripe.expect_retrieve_subscription().returning(|_| {
        Ok(serde_json::from_value(stripe_subscription("sub_1", "active", None, "month")).unwrap())
    });

    let usecase = SubscriptionUseCase::new(
        Arc::clone(&subscriptions),
        Arc::new(MockUserRepository::new()),
        Some(Arc::new(stripe)),
    );

    usecase
        .handle_webhook(b"payload", Some("t=1,v1=00"))
        .await
        .unwrap();

    assert_eq!(subscriptions.rows_for(1)[0].status, "active");
}

#[tokio::test]
async fn unknown_event_types_are_acknowledged() {
    let mut subscriptions = MockSubscriptionRepository::new();
    subscriptions.expect_upsert_for_user().times(0);
    subscriptions.expect_update_status_for_user().times(0);
    let stripe = gateway_verifying(event("charge.refunded", json!({ "id": "ch_1" })));

    let usecase = SubscriptionUseCase::new(
        Arc::new(subscriptions),
        Arc::new(MockUserRepository::new()),
        Some(Arc::new(stripe)),
    );

    let ack = usecase
        .handle_webhook(b"payload", Some("t=1,v1=00"))
        .await
        .unwrap();
    assert!(ack.received);
}

use anyhow::Result;
use quill::domain::{
    entities::posts::PostEntity,
    repositories::subscriptions::SubscriptionRepository,
    value_objects::{posts::AccessDecision, subscriptions::subscription_grants_access},
};
use std::sync::Arc;
use tracing::debug;

/// Decides who may read premium post bodies. Read-only: never touches subscription state.
pub struct PremiumAccessResolver<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
}

impl<S> PremiumAccessResolver<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>) -> Self {
        Self { subscription_repo }
    }

    /// Whether the viewer's authoritative subscription unlocks premium content.
    /// Anonymous or unresolved viewers never do.
    pub async fn viewer_has_access(&self, user_id: Option<i64>) -> Result<bool> {
        let Some(user_id) = user_id else {
            return Ok(false);
        };

        let subscription = self.subscription_repo.find_latest_by_user_id(user_id).await?;
        let has_access = subscription_grants_access(subscription.as_ref());

        debug!(
            user_id,
            has_access,
            status = ?subscription.as_ref().map(|sub| sub.status.as_str()),
            "premium_access: resolved viewer access"
        );

        Ok(has_access)
    }

    pub async fn decide(&self, post: &PostEntity, user_id: Option<i64>) -> Result<AccessDecision> {
        if !post.is_premium {
            return Ok(AccessDecision::for_post(post, true));
        }

        let has_access = self.viewer_has_access(user_id).await?;
        Ok(AccessDecision::for_post(post, has_access))
    }
}

/// Gate for a post once the viewer's access is known, so listings look it up once.
pub fn decide_with(post: &PostEntity, viewer_has_access: bool) -> AccessDecision {
    AccessDecision::for_post(post, !post.is_premium || viewer_has_access)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use mockall::predicate::eq;
    use quill::domain::{
        entities::subscriptions::SubscriptionEntity,
        repositories::subscriptions::MockSubscriptionRepository,
        value_objects::enums::{
            subscription_plans::SubscriptionPlan, subscription_statuses::SubscriptionStatus,
        },
    };

    pub(crate) fn post_entity(id: i64, is_premium: bool, content: &str) -> PostEntity {
        let now = Utc::now();
        PostEntity {
            id,
            title: format!("Post {id}"),
            content: content.to_string(),
            preview: None,
            image_id: None,
            status: "published".to_string(),
            is_premium,
            labels: vec![],
            author_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn subscription_entity(
        user_id: i64,
        status: SubscriptionStatus,
        plan: Option<SubscriptionPlan>,
    ) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: 1,
            user_id,
            external_customer_id: Some("cus_1".to_string()),
            external_subscription_id: Some("sub_1".to_string()),
            status: status.to_string(),
            plan: plan.map(|p| p.to_string()),
            current_period_end: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn repo_returning(
        user_id: i64,
        subscription: Option<SubscriptionEntity>,
    ) -> MockSubscriptionRepository {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_latest_by_user_id()
            .with(eq(user_id))
            .returning(move |_| {
                let subscription = subscription.clone();
                Box::pin(async move { Ok(subscription) })
            });
        repo
    }

    const BODY: &str = "Para one.\n\nPara two.\n\nPara three.";

    #[tokio::test]
    async fn free_posts_are_always_readable() {
        // No expectations: any subscription lookup would panic.
        let resolver = PremiumAccessResolver::new(Arc::new(MockSubscriptionRepository::new()));
        let post = post_entity(1, false, BODY);

        for viewer in [None, Some(3)] {
            let decision = resolver.decide(&post, viewer).await.unwrap();
            assert!(decision.has_access);
            assert_eq!(decision.content, BODY);
        }
        assert!(decide_with(&post, false).has_access);
    }

    #[tokio::test]
    async fn anonymous_viewer_gets_preview() {
        let resolver = PremiumAccessResolver::new(Arc::new(MockSubscriptionRepository::new()));

        let decision = resolver
            .decide(&post_entity(1, true, BODY), None)
            .await
            .unwrap();

        assert!(!decision.has_access);
        assert_eq!(decision.content, "Para one.\n\nPara two.");
    }

    #[tokio::test]
    async fn grace_period_and_trial_unlock_content() {
        let past_due = repo_returning(
            5,
            Some(subscription_entity(5, SubscriptionStatus::PastDue, Some(SubscriptionPlan::Monthly))),
        );
        let resolver = PremiumAccessResolver::new(Arc::new(past_due));
        assert!(resolver.viewer_has_access(Some(5)).await.unwrap());

        let trial = repo_returning(
            6,
            Some(subscription_entity(6, SubscriptionStatus::Inactive, Some(SubscriptionPlan::Trial))),
        );
        let resolver = PremiumAccessResolver::new(Arc::new(trial));
        assert!(resolver.viewer_has_access(Some(6)).await.unwrap());
    }

    #[tokio::test]
    async fn canceled_or_missing_subscription_is_denied() {
        let canceled = repo_returning(
            5,
            Some(subscription_entity(5, SubscriptionStatus::Canceled, Some(SubscriptionPlan::Yearly))),
        );
        let resolver = PremiumAccessResolver::new(Arc::new(canceled));
        let decision = resolver
            .decide(&post_entity(1, true, BODY), Some(5))
            .await
            .unwrap();
        assert!(decision.requires_subscription());

        let resolver = PremiumAccessResolver::new(Arc::new(repo_returning(9, None)));
        assert!(!resolver.viewer_has_access(Some(9)).await.unwrap());
    }
}

//! 邀请关系服务
//!
//! 注册时登记邀请关系；关系的完成与奖励发放在积分服务的
//! 首次入账钩子中处理

use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::{LoyaltyError, Result};
use crate::models::{Referral, ReferralStatus, User};
use crate::repository::{ReferralRepositoryTrait, UserRepositoryTrait};
use crate::service::dto::ReferralSummary;

/// 邀请关系服务
pub struct ReferralService<UR, RR>
where
    UR: UserRepositoryTrait,
    RR: ReferralRepositoryTrait,
{
    user_repo: Arc<UR>,
    referral_repo: Arc<RR>,
}

impl<UR, RR> ReferralService<UR, RR>
where
    UR: UserRepositoryTrait,
    RR: ReferralRepositoryTrait,
{
    pub fn new(user_repo: Arc<UR>, referral_repo: Arc<RR>) -> Self {
        Self {
            user_repo,
            referral_repo,
        }
    }

    /// 登记邀请关系（注册时调用）
    ///
    /// 按邀请码找到邀请人，拒绝自邀和重复登记，创建待完成关系。
    /// 奖励在被邀请人首次获得积分时发放。
    #[instrument(skip(self), fields(code = %referral_code, referred_id = new_user_id))]
    pub async fn register_referral(
        &self,
        referral_code: &str,
        new_user_id: i64,
    ) -> Result<Referral> {
        let referrer = self
            .user_repo
            .get_by_referral_code(referral_code)
            .await?
            .ok_or_else(|| LoyaltyError::ReferralCodeInvalid(referral_code.to_string()))?;

        if referrer.id == new_user_id {
            return Err(LoyaltyError::SelfReferral);
        }

        if self
            .referral_repo
            .get_by_referred(new_user_id)
            .await?
            .is_some()
        {
            return Err(LoyaltyError::ReferralExists(new_user_id));
        }

        let referral = self.referral_repo.create(referrer.id, new_user_id).await?;

        info!(
            referral_id = referral.id,
            referrer_id = referrer.id,
            referred_id = new_user_id,
            "邀请关系已登记"
        );

        Ok(referral)
    }

    /// 邀请进展摘要
    pub async fn summary(&self, user: &User) -> Result<ReferralSummary> {
        let referrals = self.referral_repo.list_by_referrer(user.id).await?;

        let total_invited = referrals.len() as i64;
        let completed = referrals
            .iter()
            .filter(|r| r.status == ReferralStatus::Completed)
            .count() as i64;
        let points_earned: i64 = referrals
            .iter()
            .filter(|r| r.status == ReferralStatus::Completed)
            .map(|r| r.referrer_points)
            .sum();

        Ok(ReferralSummary {
            referral_code: user.referral_code.clone(),
            total_invited,
            completed,
            pending: total_invited - completed,
            points_earned,
        })
    }

    /// 被邀请人视角的邀请关系
    pub async fn referral_of(&self, user_id: i64) -> Result<Option<Referral>> {
        self.referral_repo.get_by_referred(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserStatus;
    use crate::repository::{MockReferralRepositoryTrait, MockUserRepositoryTrait};
    use chrono::Utc;

    fn test_user(id: i64, referral_code: &str) -> User {
        User {
            id,
            email: format!("user{}@example.com", id),
            name: format!("User {}", id),
            password_hash: String::new(),
            points_balance: 0,
            lifetime_points: 0,
            rank_id: None,
            referral_code: referral_code.to_string(),
            referred_by: None,
            status: UserStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_referral(id: i64, referrer_id: i64, referred_id: i64, status: ReferralStatus) -> Referral {
        Referral {
            id,
            referrer_id,
            referred_id,
            status,
            referrer_points: if status == ReferralStatus::Completed { 500 } else { 0 },
            referred_points: if status == ReferralStatus::Completed { 250 } else { 0 },
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_register_referral_success() {
        let mut user_repo = MockUserRepositoryTrait::new();
        user_repo
            .expect_get_by_referral_code()
            .returning(|code| Ok(Some(test_user(42, code))));

        let mut referral_repo = MockReferralRepositoryTrait::new();
        referral_repo.expect_get_by_referred().returning(|_| Ok(None));
        referral_repo
            .expect_create()
            .withf(|referrer_id, referred_id| *referrer_id == 42 && *referred_id == 7)
            .returning(|referrer_id, referred_id| {
                Ok(test_referral(1, referrer_id, referred_id, ReferralStatus::Pending))
            });

        let service = ReferralService::new(Arc::new(user_repo), Arc::new(referral_repo));
        let referral = service.register_referral("GOOD2345", 7).await.unwrap();

        assert_eq!(referral.referrer_id, 42);
        assert_eq!(referral.referred_id, 7);
        assert_eq!(referral.status, ReferralStatus::Pending);
    }

    #[tokio::test]
    async fn test_register_referral_invalid_code() {
        let mut user_repo = MockUserRepositoryTrait::new();
        user_repo
            .expect_get_by_referral_code()
            .returning(|_| Ok(None));

        let service =
            ReferralService::new(Arc::new(user_repo), Arc::new(MockReferralRepositoryTrait::new()));
        let err = service.register_referral("NOPE2345", 7).await.unwrap_err();

        assert!(matches!(err, LoyaltyError::ReferralCodeInvalid(_)));
    }

    #[tokio::test]
    async fn test_register_referral_self() {
        let mut user_repo = MockUserRepositoryTrait::new();
        user_repo
            .expect_get_by_referral_code()
            .returning(|code| Ok(Some(test_user(7, code))));

        let service =
            ReferralService::new(Arc::new(user_repo), Arc::new(MockReferralRepositoryTrait::new()));
        let err = service.register_referral("SELF2345", 7).await.unwrap_err();

        assert!(matches!(err, LoyaltyError::SelfReferral));
    }

    #[tokio::test]
    async fn test_register_referral_duplicate() {
        let mut user_repo = MockUserRepositoryTrait::new();
        user_repo
            .expect_get_by_referral_code()
            .returning(|code| Ok(Some(test_user(42, code))));

        let mut referral_repo = MockReferralRepositoryTrait::new();
        referral_repo.expect_get_by_referred().returning(|referred_id| {
            Ok(Some(test_referral(1, 99, referred_id, ReferralStatus::Pending)))
        });

        let service = ReferralService::new(Arc::new(user_repo), Arc::new(referral_repo));
        let err = service.register_referral("GOOD2345", 7).await.unwrap_err();

        assert!(matches!(err, LoyaltyError::ReferralExists(7)));
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let user_repo = MockUserRepositoryTrait::new();
        let mut referral_repo = MockReferralRepositoryTrait::new();
        referral_repo.expect_list_by_referrer().returning(|referrer_id| {
            Ok(vec![
                test_referral(1, referrer_id, 11, ReferralStatus::Completed),
                test_referral(2, referrer_id, 12, ReferralStatus::Completed),
                test_referral(3, referrer_id, 13, ReferralStatus::Pending),
            ])
        });

        let service = ReferralService::new(Arc::new(user_repo), Arc::new(referral_repo));
        let user = test_user(42, "MINE2345");
        let summary = service.summary(&user).await.unwrap();

        assert_eq!(summary.referral_code, "MINE2345");
        assert_eq!(summary.total_invited, 3);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.points_earned, 1000);
    }
}

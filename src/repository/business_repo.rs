//! Business (tenant) repository

use crate::{error::AppError, models::business::*};
use rand::Rng;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct BusinessRepository {
    db: PgPool,
}

impl BusinessRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Short human-readable tenant code, e.g. BIZ-4F7K2M
    pub fn generate_business_code() -> String {
        const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
        let mut rng = rand::thread_rng();
        let suffix: String = (0..6)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect();
        format!("BIZ-{}", suffix)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Business>, AppError> {
        let business = sqlx::query_as::<_, Business>(
            "SELECT * FROM businesses WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(business)
    }

    pub async fn update(
        &self,
        id: Uuid,
        req: &UpdateBusinessRequest,
    ) -> Result<Option<Business>, AppError> {
        let business = sqlx::query_as::<_, Business>(
            r#"
            UPDATE businesses
            SET
                name = COALESCE($2, name),
                owner_name = COALESCE($3, owner_name),
                owner_email = COALESCE($4, owner_email),
                owner_phone = COALESCE($5, owner_phone),
                address = COALESCE($6, address),
                subscription_plan = COALESCE($7, subscription_plan),
                monthly_fee = COALESCE($8, monthly_fee),
                updated_at = NOW()
            WHERE id = $1 AND NOT is_deleted
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.owner_name)
        .bind(&req.owner_email)
        .bind(&req.owner_phone)
        .bind(&req.address)
        .bind(&req.subscription_plan)
        .bind(req.monthly_fee)
        .fetch_optional(&self.db)
        .await?;

        Ok(business)
    }

    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE businesses SET is_active = $2, updated_at = NOW() WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .bind(is_active)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Superadmin board: businesses with usage counts
    pub async fn list_overview(
        &self,
        query: &BusinessListQuery,
    ) -> Result<(Vec<BusinessOverview>, i64), AppError> {
        let offset = (query.page.max(1) - 1) * query.limit;
        let search = query.search.as_ref().map(|s| format!("%{}%", s));

        let rows = sqlx::query_as::<_, BusinessOverview>(
            r#"
            SELECT
                b.id, b.name, b.business_code, b.subscription_plan, b.monthly_fee,
                b.payment_status, b.is_active, b.next_payment_due_date, b.created_at,
                COUNT(DISTINCT u.id) FILTER (WHERE NOT u.is_deleted) AS active_users,
                COUNT(DISTINCT p.id) FILTER (WHERE NOT p.is_deleted) AS total_products
            FROM businesses b
            LEFT JOIN users u ON u.business_id = b.id
            LEFT JOIN products p ON p.business_id = b.id
            WHERE NOT b.is_deleted
              AND ($1::text IS NULL OR b.name ILIKE $1 OR b.business_code ILIKE $1)
              AND ($2::text IS NULL OR b.payment_status = $2)
            GROUP BY b.id
            ORDER BY b.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&search)
        .bind(&query.payment_status)
        .bind(query.limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) FROM businesses b
            WHERE NOT b.is_deleted
              AND ($1::text IS NULL OR b.name ILIKE $1 OR b.business_code ILIKE $1)
              AND ($2::text IS NULL OR b.payment_status = $2)
            "#,
        )
        .bind(&search)
        .bind(&query.payment_status)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok((rows, total))
    }

    pub async fn statistics(&self, id: Uuid) -> Result<BusinessStatistics, AppError> {
        let stats = sqlx::query_as::<_, BusinessStatistics>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE business_id = $1 AND NOT is_deleted) AS total_users,
                (SELECT COUNT(*) FROM products WHERE business_id = $1 AND NOT is_deleted) AS total_products,
                (SELECT COUNT(*) FROM customers WHERE business_id = $1 AND NOT is_deleted) AS total_customers,
                (SELECT COUNT(*) FROM sales
                 WHERE business_id = $1 AND parent_sale_id IS NULL AND NOT is_deleted) AS total_sales,
                COALESCE((SELECT SUM(total_amount) FROM sales
                 WHERE business_id = $1 AND parent_sale_id IS NULL AND NOT is_deleted
                   AND status <> 'refunded'), 0) AS total_revenue,
                COALESCE((SELECT SUM(s.total_amount - s.amount_paid - COALESCE(p.paid, 0))
                 FROM sales s
                 LEFT JOIN LATERAL (
                     SELECT SUM(amount_paid) AS paid FROM sales
                     WHERE parent_sale_id = s.id AND NOT is_deleted
                 ) p ON TRUE
                 WHERE s.business_id = $1 AND s.status = 'unpaid'
                   AND s.parent_sale_id IS NULL AND NOT s.is_deleted), 0) AS outstanding_credit
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        Ok(stats)
    }

    const BRANDING_COLUMNS: &'static str = r#"
        primary_color, secondary_color, accent_color, theme, branding_enabled,
        tagline, contact_email, contact_phone, website, address,
        social_media, business_hours, currency, timezone, language
    "#;

    pub async fn branding(&self, id: Uuid) -> Result<Option<BrandingSettings>, AppError> {
        let settings = sqlx::query_as::<_, BrandingSettings>(&format!(
            "SELECT {} FROM businesses WHERE id = $1 AND NOT is_deleted",
            Self::BRANDING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(settings)
    }

    pub async fn update_branding(
        &self,
        id: Uuid,
        req: &UpdateBrandingRequest,
    ) -> Result<Option<BrandingSettings>, AppError> {
        let settings = sqlx::query_as::<_, BrandingSettings>(&format!(
            r#"
            UPDATE businesses
            SET
                primary_color = COALESCE($2, primary_color),
                secondary_color = COALESCE($3, secondary_color),
                accent_color = COALESCE($4, accent_color),
                theme = COALESCE($5, theme),
                branding_enabled = COALESCE($6, branding_enabled),
                tagline = COALESCE($7, tagline),
                contact_email = COALESCE($8, contact_email),
                contact_phone = COALESCE($9, contact_phone),
                website = COALESCE($10, website),
                address = COALESCE($11, address),
                social_media = COALESCE($12, social_media),
                business_hours = COALESCE($13, business_hours),
                currency = COALESCE($14, currency),
                timezone = COALESCE($15, timezone),
                language = COALESCE($16, language),
                updated_at = NOW()
            WHERE id = $1 AND NOT is_deleted
            RETURNING {}
            "#,
            Self::BRANDING_COLUMNS
        ))
        .bind(id)
        .bind(&req.primary_color)
        .bind(&req.secondary_color)
        .bind(&req.accent_color)
        .bind(&req.theme)
        .bind(req.branding_enabled)
        .bind(&req.tagline)
        .bind(&req.contact_email)
        .bind(&req.contact_phone)
        .bind(&req.website)
        .bind(&req.address)
        .bind(&req.social_media)
        .bind(&req.business_hours)
        .bind(&req.currency)
        .bind(&req.timezone)
        .bind(&req.language)
        .fetch_optional(&self.db)
        .await?;

        Ok(settings)
    }

    pub async fn set_payment_status(
        &self,
        id: Uuid,
        status: &str,
        suspension_reason: Option<&str>,
    ) -> Result<(), AppError> {
        match status {
            "suspended" => {
                sqlx::query(
                    r#"
                    UPDATE businesses
                    SET payment_status = 'suspended',
                        suspension_date = NOW(),
                        suspension_reason = $2,
                        is_active = FALSE,
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(suspension_reason)
                .execute(&self.db)
                .await?;
            }
            "active" => {
                sqlx::query(
                    r#"
                    UPDATE businesses
                    SET payment_status = 'active',
                        suspension_date = NULL,
                        suspension_reason = NULL,
                        grace_period_end_date = NULL,
                        is_active = TRUE,
                        last_payment_date = CURRENT_DATE,
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .execute(&self.db)
                .await?;
            }
            other => {
                sqlx::query(
                    "UPDATE businesses SET payment_status = $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(id)
                .bind(other)
                .execute(&self.db)
                .await?;
            }
        }

        Ok(())
    }

    pub async fn update_due_date(
        &self,
        id: Uuid,
        next_payment_due_date: Option<chrono::NaiveDate>,
        grace_period_days: Option<i32>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE businesses
            SET
                next_payment_due_date = COALESCE($2, next_payment_due_date),
                grace_period_days = COALESCE($3, grace_period_days),
                updated_at = NOW()
            WHERE id = $1 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .bind(next_payment_due_date)
        .bind(grace_period_days)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_code_shape() {
        let code = BusinessRepository::generate_business_code();
        assert!(code.starts_with("BIZ-"));
        assert_eq!(code.len(), 10);
        // Ambiguous characters are excluded from the alphabet
        assert!(!code[4..].contains('O'));
        assert!(!code[4..].contains('0'));
        assert!(!code[4..].contains('I'));
        assert!(!code[4..].contains('1'));
    }
}

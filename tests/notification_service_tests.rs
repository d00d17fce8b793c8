//! Notification fan-out and threading integration tests

use retail_system::{
    auth::middleware::AuthContext,
    error::AppError,
    models::{notification::SendNotificationRequest, user::Role},
    repository::NotificationRepository,
    services::NotificationService,
};
use serial_test::serial;
use sqlx::PgPool;
use uuid::Uuid;

mod common;
use common::{create_test_business, create_test_user, setup_test_db};

struct NotificationFixture {
    pool: PgPool,
    service: NotificationService,
    business_id: Uuid,
    admin: AuthContext,
    manager: AuthContext,
    cashier: AuthContext,
}

fn ctx(user_id: Uuid, username: &str, role: Role, business_id: Uuid) -> AuthContext {
    AuthContext {
        user_id,
        username: username.to_string(),
        role,
        business_id: Some(business_id),
    }
}

async fn setup() -> NotificationFixture {
    let config = common::create_test_config();
    let pool = setup_test_db(&config).await;

    let business_id = create_test_business(&pool, "Notify Shop").await;
    let admin_id =
        create_test_user(&pool, Some(business_id), "notifyadmin", "StrongPass1", "admin").await;
    let manager_id =
        create_test_user(&pool, Some(business_id), "notifymgr", "StrongPass1", "manager").await;
    let cashier_id =
        create_test_user(&pool, Some(business_id), "notifycash", "StrongPass1", "cashier").await;

    NotificationFixture {
        service: NotificationService::new(pool.clone()),
        pool,
        business_id,
        admin: ctx(admin_id, "notifyadmin", Role::Admin, business_id),
        manager: ctx(manager_id, "notifymgr", Role::Manager, business_id),
        cashier: ctx(cashier_id, "notifycash", Role::Cashier, business_id),
    }
}

fn broadcast(title: &str, target_role: Option<&str>) -> SendNotificationRequest {
    SendNotificationRequest {
        title: Some(title.to_string()),
        message: "test message".to_string(),
        notification_type: None,
        priority: None,
        target_role: target_role.map(str::to_string),
        parent_id: None,
    }
}

async fn recipient_ids(pool: &PgPool, notification_id: Uuid) -> Vec<Uuid> {
    sqlx::query_scalar("SELECT user_id FROM user_notifications WHERE notification_id = $1")
        .bind(notification_id)
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
async fn test_broadcast_to_all_excludes_sender() {
    let fx = setup().await;

    let notification = fx
        .service
        .send(&fx.admin, fx.business_id, &broadcast("Staff meeting", None))
        .await
        .unwrap();

    let recipients = recipient_ids(&fx.pool, notification.id).await;
    assert_eq!(recipients.len(), 2);
    assert!(!recipients.contains(&fx.admin.user_id));
    assert!(recipients.contains(&fx.manager.user_id));
    assert!(recipients.contains(&fx.cashier.user_id));
}

#[tokio::test]
#[serial]
async fn test_broadcast_filters_by_target_role() {
    let fx = setup().await;

    let notification = fx
        .service
        .send(
            &fx.admin,
            fx.business_id,
            &broadcast("Managers only", Some("manager")),
        )
        .await
        .unwrap();

    let recipients = recipient_ids(&fx.pool, notification.id).await;
    assert_eq!(recipients, vec![fx.manager.user_id]);
}

#[tokio::test]
#[serial]
async fn test_cashier_cannot_broadcast_to_all() {
    let fx = setup().await;

    let err = fx
        .service
        .send(&fx.cashier, fx.business_id, &broadcast("Hello everyone", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    // but messaging upwards is allowed
    fx.service
        .send(
            &fx.cashier,
            fx.business_id,
            &broadcast("Till is short", Some("manager")),
        )
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn test_broadcast_requires_title() {
    let fx = setup().await;

    let mut req = broadcast("", None);
    req.title = None;

    let err = fx
        .service
        .send(&fx.admin, fx.business_id, &req)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
#[serial]
async fn test_reply_goes_to_parent_sender_only() {
    let fx = setup().await;

    let root = fx
        .service
        .send(&fx.admin, fx.business_id, &broadcast("Inventory question", None))
        .await
        .unwrap();

    let reply = fx
        .service
        .send(
            &fx.manager,
            fx.business_id,
            &SendNotificationRequest {
                title: None,
                message: "Checked, all fine".to_string(),
                notification_type: None,
                priority: None,
                target_role: None,
                parent_id: Some(root.id),
            },
        )
        .await
        .unwrap();

    assert_eq!(reply.parent_id, Some(root.id));
    assert_eq!(reply.title, "Re: Inventory question");

    let recipients = recipient_ids(&fx.pool, reply.id).await;
    assert_eq!(recipients, vec![fx.admin.user_id]);
}

#[tokio::test]
#[serial]
async fn test_reply_title_is_not_double_prefixed() {
    let fx = setup().await;

    let root = fx
        .service
        .send(&fx.admin, fx.business_id, &broadcast("Schedule", None))
        .await
        .unwrap();

    let first_reply = fx
        .service
        .send(
            &fx.manager,
            fx.business_id,
            &SendNotificationRequest {
                title: None,
                message: "works for me".to_string(),
                notification_type: None,
                priority: None,
                target_role: None,
                parent_id: Some(root.id),
            },
        )
        .await
        .unwrap();
    assert_eq!(first_reply.title, "Re: Schedule");

    // replies always thread off the root
    let second_reply = fx
        .service
        .send(
            &fx.admin,
            fx.business_id,
            &SendNotificationRequest {
                title: None,
                message: "confirmed".to_string(),
                notification_type: None,
                priority: None,
                target_role: None,
                parent_id: Some(root.id),
            },
        )
        .await
        .unwrap();
    assert_eq!(second_reply.title, "Re: Schedule");
}

#[tokio::test]
#[serial]
async fn test_reply_to_reply_is_rejected() {
    let fx = setup().await;

    let root = fx
        .service
        .send(&fx.admin, fx.business_id, &broadcast("Root", None))
        .await
        .unwrap();
    let reply = fx
        .service
        .send(
            &fx.manager,
            fx.business_id,
            &SendNotificationRequest {
                title: None,
                message: "first".to_string(),
                notification_type: None,
                priority: None,
                target_role: None,
                parent_id: Some(root.id),
            },
        )
        .await
        .unwrap();

    let err = fx
        .service
        .send(
            &fx.cashier,
            fx.business_id,
            &SendNotificationRequest {
                title: None,
                message: "nested".to_string(),
                notification_type: None,
                priority: None,
                target_role: None,
                parent_id: Some(reply.id),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[serial]
async fn test_thread_and_read_state() {
    let fx = setup().await;

    let root = fx
        .service
        .send(&fx.admin, fx.business_id, &broadcast("Thread root", None))
        .await
        .unwrap();
    fx.service
        .send(
            &fx.manager,
            fx.business_id,
            &SendNotificationRequest {
                title: None,
                message: "a reply".to_string(),
                notification_type: None,
                priority: None,
                target_role: None,
                parent_id: Some(root.id),
            },
        )
        .await
        .unwrap();

    let repo = NotificationRepository::new(fx.pool.clone());

    let thread = repo
        .thread(root.id, fx.business_id, fx.manager.user_id)
        .await
        .unwrap()
        .expect("thread should exist");
    assert_eq!(thread.root.id, root.id);
    assert_eq!(thread.replies.len(), 1);

    assert_eq!(repo.unread_count(fx.manager.user_id).await.unwrap(), 1);
    assert!(repo.mark_read(root.id, fx.manager.user_id).await.unwrap());
    assert_eq!(repo.unread_count(fx.manager.user_id).await.unwrap(), 0);
}

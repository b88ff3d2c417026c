use std::future::Future;

use serde::Serialize;

use crate::access::{AccessPolicy, AuthzDecision, Route};
use crate::error::AppResult;
use crate::identity::User;

/// What a gated page renders once the user is known: its content, or the
/// blocked view for a signed-in user below the route's level.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum PageView<P> {
    Content { user: User, props: P },
    NoAccess { user: User, decision: AuthzDecision },
}

impl<P> PageView<P> {
    pub fn is_blocked(&self) -> bool { matches!(self, PageView::NoAccess { .. }) }
}

/// Check `route` for an already authenticated `user`; `content` runs only when granted.
pub async fn render_for<P, F, Fut>(policy: &AccessPolicy, user: User, route: Route, content: F) -> AppResult<PageView<P>>
where
    F: FnOnce(&User) -> Fut,
    Fut: Future<Output = AppResult<P>>,
{
    let decision = policy.decide(user.access, route)?;
    if !decision.granted {
        tracing::debug!(target: "dispo::gate", user = %user.username, route = %route, "page blocked");
        return Ok(PageView::NoAccess { user, decision });
    }
    let props = content(&user).await?;
    Ok(PageView::Content { user, props })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessLevel;

    #[tokio::test]
    async fn insufficient_level_renders_blocked_view() {
        let policy = AccessPolicy::standard().unwrap();
        let view = render_for(&policy, User::new("sl", AccessLevel(2)), Route::Users, |_u| async {
            Err::<(), _>(crate::error::AppError::internal("test", "content loaded for a blocked user"))
        })
        .await
        .unwrap();
        assert!(view.is_blocked());
    }

    #[tokio::test]
    async fn granted_level_renders_content() {
        let policy = AccessPolicy::standard().unwrap();
        let view = render_for(&policy, User::new("admin", AccessLevel(9)), Route::Users, |u| {
            let name = u.username.clone();
            async move { Ok(name.len()) }
        })
        .await
        .unwrap();
        assert_eq!(view, PageView::Content { user: User::new("admin", AccessLevel(9)), props: 5 });
    }
}

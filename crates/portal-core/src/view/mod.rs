//! Screen enumeration shared by the router and configuration.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A screen the rendering layer can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ViewState {
    Login,
    Register,
    /// Product listing (commerce).
    Catalog,
    Cart,
    Profile,
    /// Article and video listing (news).
    Feed,
    ArticleDetail,
}

impl ViewState {
    /// Screens that host the authentication forms.
    pub fn is_auth_screen(&self) -> bool {
        matches!(self, Self::Login | Self::Register)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_view_names() {
        assert_eq!(ViewState::ArticleDetail.to_string(), "article_detail");
        assert_eq!(ViewState::from_str("cart").unwrap(), ViewState::Cart);
    }
}

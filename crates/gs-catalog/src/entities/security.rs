//! Users, roles and passwords of the default security services.

use gs_common::{GsError, GsResult, ResourceKey};
use gs_xml::{Element, XmlBuilder};
use reqwest::Method;
use tracing::{info, warn};

use crate::catalog::{Catalog, ListFilter};
use crate::descriptor::{FieldSpec, ResourceDescriptor};
use crate::locator::Locator;
use crate::resource::BoundResource;
use crate::transport::HttpRequest;

use super::render_body;

const XML: &str = "application/xml";

pub static USER: ResourceDescriptor = ResourceDescriptor {
    resource_type: "user",
    locator: Locator::global("security/usergroup/users", "user")
        .without_extension()
        .named_by("userName"),
    write_all: false,
    fields: &[
        FieldSpec::text("userName"),
        FieldSpec::text("password"),
        FieldSpec::forced_flag("enabled"),
    ],
};

fn role_names(doc: &Element) -> Vec<String> {
    doc.find_all("role")
        .into_iter()
        .filter_map(Element::text)
        .map(str::to_string)
        .collect()
}

impl Catalog {
    /// Users of the default user group service, optionally restricted to
    /// `names`.
    pub async fn get_users(&self, names: &[&str]) -> GsResult<Vec<BoundResource>> {
        self.list(&USER, &ListFilter::named(names.iter().copied())).await
    }

    /// Create an enabled user. An existing user is returned as is; its
    /// password is not changed.
    pub async fn create_user(&self, username: &str, password: &str) -> GsResult<Option<BoundResource>> {
        if let Some(existing) = self.get_users(&[username]).await?.into_iter().next() {
            warn!(user = username, "User already exists");
            return Ok(Some(existing));
        }

        let mut user = self.unsaved(
            &USER,
            ResourceKey::new(username),
            vec![("userName", username.into()), ("password", password.into())],
        )?;
        self.save_expecting(&mut user, &[200, 201, 202]).await?;
        info!(user = username, "Created user");
        Ok(self.get_users(&[username]).await?.into_iter().next())
    }

    /// Every role name.
    pub async fn get_roles(&self) -> GsResult<Vec<String>> {
        let url = self.url(&["security", "roles"])?;
        Ok(role_names(&self.get_xml(&url).await?))
    }

    /// Roles granted to one user.
    pub async fn get_roles_user(&self, username: &str) -> GsResult<Vec<String>> {
        let url = self.url(&["security", "roles", "user", username])?;
        Ok(role_names(&self.get_xml(&url).await?))
    }

    pub async fn add_role_user(&self, role: &str, username: &str) -> GsResult<()> {
        let url = self.url(&["security", "roles", "role", role, "user", username])?;
        self.write(HttpRequest::new(Method::POST, url), &[200]).await?;
        Ok(())
    }

    pub async fn del_role_user(&self, role: &str, username: &str) -> GsResult<()> {
        let url = self.url(&["security", "roles", "role", role, "user", username])?;
        self.write(HttpRequest::new(Method::DELETE, url), &[200]).await?;
        Ok(())
    }

    /// The keystore master password. Always read from the server, never
    /// from the response cache.
    pub async fn get_master_pwd(&self) -> GsResult<Option<String>> {
        let url = self.url(&["security", "masterpw.xml"])?;
        let response = self.request(HttpRequest::get(url.as_str()).accept(XML)).await?;
        if response.status != 200 {
            return Err(GsError::failed_request(response.status, url, response.text()));
        }
        let dom = Element::parse(&response.text()).map_err(|e| GsError::MalformedResponse {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(dom.find_text("oldMasterPassword").map(str::to_string))
    }

    /// Change the master password, then reload the server configuration.
    /// Setting the current password again writes nothing.
    pub async fn set_master_pwd(&self, new_pwd: &str) -> GsResult<()> {
        let old_pwd = self.get_master_pwd().await?.unwrap_or_default();
        if old_pwd == new_pwd {
            return Ok(());
        }

        let mut out = XmlBuilder::new();
        out.start("masterPassword")
            .text_element("oldMasterPassword", &old_pwd)
            .text_element("newMasterPassword", new_pwd)
            .end("masterPassword");
        let url = self.url(&["security", "masterpw.xml"])?;
        let request = HttpRequest::new(Method::PUT, url).body(XML, render_body(&out)?);
        self.write(request, &[200]).await?;
        self.reload().await
    }

    /// Change the password of the authenticated user, then reload.
    ///
    /// The catalog keeps sending the old credentials; build a new one with
    /// the new password to go on talking to the server.
    pub async fn set_my_pwd(&self, new_pwd: &str) -> GsResult<()> {
        let mut out = XmlBuilder::new();
        out.start("userPassword")
            .text_element("newPassword", new_pwd)
            .end("userPassword");
        let url = self.url(&["security", "self", "password.xml"])?;
        let request = HttpRequest::new(Method::PUT, url).body(XML, render_body(&out)?);
        self.write(request, &[200]).await?;
        self.reload().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names() {
        let doc = Element::parse("<roles><role>ADMIN</role><role>GROUP_ADMIN</role></roles>").unwrap();
        assert_eq!(role_names(&doc), vec!["ADMIN", "GROUP_ADMIN"]);
        let empty = Element::parse("<roles/>").unwrap();
        assert!(role_names(&empty).is_empty());
    }

    #[test]
    fn test_user_addressing() {
        let base = crate::url::parse_service_url("http://localhost:8080/geoserver/rest/").unwrap();
        assert_eq!(
            USER.locator.listing_url(&base, None, None).unwrap(),
            "http://localhost:8080/geoserver/rest/security/usergroup/users/"
        );
        assert_eq!(
            USER.locator.identity_url(&base, &ResourceKey::new("alice")).unwrap(),
            "http://localhost:8080/geoserver/rest/security/usergroup/users/alice"
        );
    }
}

//! Global server settings.
//!
//! The settings document nests several sub-documents. The server replaces a
//! sub-document wholesale when it appears in a PUT, so they are written with
//! every field as soon as one of them is edited.

use gs_common::{GsResult, ResourceKey};

use crate::catalog::Catalog;
use crate::descriptor::{FieldSpec, ResourceDescriptor};
use crate::locator::Locator;
use crate::resource::BoundResource;

pub static CONTACT: ResourceDescriptor = ResourceDescriptor {
    resource_type: "contact",
    locator: Locator::embedded(),
    write_all: true,
    fields: &[
        FieldSpec::text("addressCity"),
        FieldSpec::text("addressCountry"),
        FieldSpec::text("addressType"),
        FieldSpec::text("contactEmail"),
        FieldSpec::text("contactOrganization"),
        FieldSpec::text("contactPerson"),
        FieldSpec::text("contactPosition"),
    ],
};

pub static SETTINGS: ResourceDescriptor = ResourceDescriptor {
    resource_type: "settings",
    locator: Locator::embedded(),
    write_all: true,
    fields: &[
        FieldSpec::text("id"),
        FieldSpec::nested("contact", &CONTACT),
        FieldSpec::text("charset"),
        FieldSpec::int("numDecimals"),
        FieldSpec::text("onlineResource"),
        FieldSpec::boolean("verbose"),
        FieldSpec::boolean("verboseExceptions"),
        FieldSpec::boolean("localWorkspaceIncludesPrefix"),
    ],
};

pub static JAI: ResourceDescriptor = ResourceDescriptor {
    resource_type: "jai",
    locator: Locator::embedded(),
    write_all: true,
    fields: &[
        FieldSpec::boolean("allowInterpolation"),
        FieldSpec::boolean("recycling"),
        FieldSpec::int("tilePriority"),
        FieldSpec::int("tileThreads"),
        FieldSpec::float("memoryCapacity"),
        FieldSpec::float("memoryThreshold"),
        FieldSpec::boolean("imageIOCache"),
        FieldSpec::boolean("pngAcceleration"),
        FieldSpec::boolean("jpegAcceleration"),
        FieldSpec::boolean("allowNativeMosaic"),
        FieldSpec::boolean("allowNativeWarp"),
    ],
};

pub static COVERAGE_ACCESS: ResourceDescriptor = ResourceDescriptor {
    resource_type: "coverageAccess",
    locator: Locator::embedded(),
    write_all: true,
    fields: &[
        FieldSpec::int("maxPoolSize"),
        FieldSpec::int("corePoolSize"),
        FieldSpec::int("keepAliveTime"),
        FieldSpec::text("queueType"),
        FieldSpec::int("imageIOCacheThreshold"),
    ],
};

pub static GLOBAL_SETTINGS: ResourceDescriptor = ResourceDescriptor {
    resource_type: "global",
    locator: Locator::singleton("settings"),
    write_all: false,
    fields: &[
        FieldSpec::nested("settings", &SETTINGS),
        FieldSpec::nested("jai", &JAI),
        FieldSpec::nested("coverageAccess", &COVERAGE_ACCESS),
        FieldSpec::int("updateSequence").read_only(),
        FieldSpec::int("featureTypeCacheSize"),
        FieldSpec::boolean("globalServices"),
        FieldSpec::int("xmlPostRequestLogBufferSize"),
    ],
};

impl Catalog {
    /// Handle on the global settings document.
    pub fn get_global_settings(&self) -> BoundResource {
        self.bind(&GLOBAL_SETTINGS, ResourceKey::new(GLOBAL_SETTINGS.resource_type))
    }

    /// The global settings, fetched.
    pub async fn fetch_global_settings(&self) -> GsResult<BoundResource> {
        let mut settings = self.get_global_settings();
        settings.fetch().await?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::FieldValue;
    use crate::transport::{HttpRequest, HttpResponse, Transport};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    const GLOBAL: &str = "<global>\
        <settings><id>SettingsInfoImpl-1</id>\
          <contact><addressCity>Alexandria</addressCity><contactPerson>Claudius Ptolomaeus</contactPerson></contact>\
          <charset>UTF-8</charset><numDecimals>8</numDecimals><verbose>false</verbose>\
        </settings>\
        <jai><allowInterpolation>false</allowInterpolation><tileThreads>7</tileThreads>\
          <memoryCapacity>0.5</memoryCapacity></jai>\
        <coverageAccess><maxPoolSize>10</maxPoolSize><queueType>UNBOUNDED</queueType></coverageAccess>\
        <updateSequence>1203</updateSequence><featureTypeCacheSize>0</featureTypeCacheSize>\
        <globalServices>true</globalServices>\
      </global>";

    struct Settings;

    #[async_trait]
    impl Transport for Settings {
        async fn execute(&self, request: HttpRequest) -> GsResult<HttpResponse> {
            if request.url.ends_with("/rest/settings") {
                Ok(HttpResponse::new(200, GLOBAL))
            } else {
                Ok(HttpResponse::new(404, "not found"))
            }
        }
    }

    fn catalog() -> Catalog {
        Catalog::with_transport("http://localhost:8080/geoserver/rest", Arc::new(Settings), Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn test_nested_reads() {
        let mut global = catalog().fetch_global_settings().await.unwrap();
        assert_eq!(global.get_int("updateSequence").await.unwrap(), Some(1203));
        let jai = global.nested("jai").await.unwrap();
        assert_eq!(jai.get_int("tileThreads").unwrap(), Some(7));
        assert_eq!(jai.get_float("memoryCapacity").unwrap(), Some(0.5));
        let contact = global.nested("settings").await.unwrap().nested_mut("contact").unwrap();
        assert_eq!(contact.get_str("addressCity").unwrap().as_deref(), Some("Alexandria"));
    }

    #[tokio::test]
    async fn test_nested_edit_writes_whole_sub_document() {
        let mut global = catalog().fetch_global_settings().await.unwrap();
        global
            .nested("coverageAccess")
            .await
            .unwrap()
            .set("maxPoolSize", FieldValue::Int(20))
            .unwrap();
        assert_eq!(
            global.message().unwrap(),
            "<global><coverageAccess><maxPoolSize>20</maxPoolSize><queueType>UNBOUNDED</queueType></coverageAccess></global>"
        );
    }

    #[tokio::test]
    async fn test_untouched_settings_write_nothing() {
        let global = catalog().fetch_global_settings().await.unwrap();
        assert_eq!(global.message().unwrap(), "<global></global>");
        assert_eq!(global.href().unwrap(), "http://localhost:8080/geoserver/rest/settings");
    }
}

//! Documents as a stock GeoServer data directory serves them.
//!
//! [`seed`] loads them into a [`FakeGeoServer`]: workspaces `topp` (the
//! default) and `sf`, a shapefile store publishing `topp:states`, a GeoTIFF
//! store publishing `sf:sfdem`, styles, a layer group, service and global
//! settings, one admin user and two roles.

use crate::fake_server::FakeGeoServer;

pub const TOPP_URI: &str = "http://www.openplans.org/topp";
pub const SF_URI: &str = "http://www.openplans.org/spearfish";
pub const MASTER_PASSWORD: &str = "geoserver";

pub const VERSION: &str = r#"<about>
  <resource name="GeoServer">
    <Build-Timestamp>12-Jun-2024 10:05</Build-Timestamp>
    <Version>2.25.2</Version>
    <Git-Revision>5f9d2a0e1b7c4d3f8a6e0b9c2d1f4e7a8b3c6d5e</Git-Revision>
  </resource>
  <resource name="GeoTools">
    <Build-Timestamp>12-Jun-2024 09:41</Build-Timestamp>
    <Version>31.2</Version>
  </resource>
</about>"#;

pub const STATES_STORE: &str = r#"<dataStore>
  <name>states_shapefile</name>
  <type>Shapefile</type>
  <enabled>true</enabled>
  <workspace>
    <name>topp</name>
  </workspace>
  <connectionParameters>
    <entry key="url">file:data/shapefiles/states.shp</entry>
    <entry key="namespace">http://www.openplans.org/topp</entry>
    <entry key="charset">ISO-8859-1</entry>
  </connectionParameters>
  <__default>false</__default>
</dataStore>"#;

pub const STATES_FEATURE_TYPE: &str = r#"<featureType>
  <name>states</name>
  <nativeName>states</nativeName>
  <namespace>
    <name>topp</name>
  </namespace>
  <title>USA Population</title>
  <abstract>This is some census data on the states.</abstract>
  <keywords>
    <string>census</string>
    <string>united</string>
    <string>boundaries</string>
    <string>state</string>
    <string>states</string>
  </keywords>
  <nativeCRS>GEOGCS["GCS_WGS_1984"]</nativeCRS>
  <srs>EPSG:4326</srs>
  <nativeBoundingBox>
    <minx>-124.731422</minx>
    <maxx>-66.969849</maxx>
    <miny>24.955967</miny>
    <maxy>49.371735</maxy>
    <crs>EPSG:4326</crs>
  </nativeBoundingBox>
  <latLonBoundingBox>
    <minx>-124.731422</minx>
    <maxx>-66.969849</maxx>
    <miny>24.955967</miny>
    <maxy>49.371735</maxy>
    <crs>EPSG:4326</crs>
  </latLonBoundingBox>
  <projectionPolicy>FORCE_DECLARED</projectionPolicy>
  <enabled>true</enabled>
  <store class="dataStore">
    <name>topp:states_shapefile</name>
  </store>
  <maxFeatures>0</maxFeatures>
  <numDecimals>0</numDecimals>
  <attributes>
    <attribute>
      <name>the_geom</name>
      <binding>org.locationtech.jts.geom.MultiPolygon</binding>
    </attribute>
    <attribute>
      <name>STATE_NAME</name>
      <binding>java.lang.String</binding>
    </attribute>
    <attribute>
      <name>PERSONS</name>
      <binding>java.lang.Double</binding>
    </attribute>
  </attributes>
</featureType>"#;

pub const STATES_LAYER: &str = r#"<layer>
  <name>topp:states</name>
  <path>/</path>
  <type>VECTOR</type>
  <defaultStyle>
    <name>population</name>
  </defaultStyle>
  <styles class="linked-hash-set">
    <style>
      <name>polygon</name>
    </style>
    <style>
      <name>pophatch</name>
      <workspace>topp</workspace>
    </style>
  </styles>
  <resource class="featureType">
    <name>topp:states</name>
    <atom:link xmlns:atom="http://www.w3.org/2005/Atom" rel="alternate" href="http://localhost:8080/geoserver/rest/workspaces/topp/datastores/states_shapefile/featuretypes/states.xml" type="application/xml"/>
  </resource>
  <queryable>true</queryable>
  <opaque>false</opaque>
  <attribution>
    <title>US Census Bureau</title>
    <href>https://www.census.gov</href>
    <logoWidth>0</logoWidth>
    <logoHeight>0</logoHeight>
  </attribution>
  <enabled>true</enabled>
</layer>"#;

pub const SFDEM_STORE: &str = r#"<coverageStore>
  <name>sfdem</name>
  <type>GeoTIFF</type>
  <enabled>true</enabled>
  <workspace>
    <name>sf</name>
  </workspace>
  <url>file:data/sf/sfdem.tif</url>
</coverageStore>"#;

pub const SFDEM_COVERAGE: &str = r#"<coverage>
  <name>sfdem</name>
  <nativeName>sfdem</nativeName>
  <namespace>
    <name>sf</name>
  </namespace>
  <title>sfdem is a Tagged Image File Format with Geographic information</title>
  <keywords>
    <string>WCS</string>
    <string>sfdem</string>
  </keywords>
  <srs>EPSG:26713</srs>
  <nativeBoundingBox>
    <minx>589980.0</minx>
    <maxx>609000.0</maxx>
    <miny>4913700.0</miny>
    <maxy>4928010.0</maxy>
    <crs class="projected">EPSG:26713</crs>
  </nativeBoundingBox>
  <projectionPolicy>REPROJECT_TO_DECLARED</projectionPolicy>
  <enabled>true</enabled>
  <store class="coverageStore">
    <name>sf:sfdem</name>
  </store>
  <nativeFormat>GeoTIFF</nativeFormat>
  <supportedFormats>
    <string>GIF</string>
    <string>PNG</string>
    <string>GEOTIFF</string>
  </supportedFormats>
</coverage>"#;

pub const SFDEM_LAYER: &str = r#"<layer>
  <name>sf:sfdem</name>
  <type>RASTER</type>
  <defaultStyle>
    <name>dem</name>
  </defaultStyle>
  <resource class="coverage">
    <name>sf:sfdem</name>
    <atom:link xmlns:atom="http://www.w3.org/2005/Atom" rel="alternate" href="http://localhost:8080/geoserver/rest/workspaces/sf/coveragestores/sfdem/coverages/sfdem.xml" type="application/xml"/>
  </resource>
  <enabled>true</enabled>
</layer>"#;

pub const POPULATION_STYLE: &str = r#"<style>
  <name>population</name>
  <format>sld</format>
  <languageVersion>
    <version>1.0.0</version>
  </languageVersion>
  <filename>population.sld</filename>
</style>"#;

pub const POPULATION_SLD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sld:StyledLayerDescriptor xmlns:sld="http://www.opengis.net/sld" xmlns:ogc="http://www.opengis.net/ogc" version="1.0.0">
  <sld:NamedLayer>
    <sld:Name>USA states population</sld:Name>
    <sld:UserStyle>
      <sld:Name>population</sld:Name>
      <sld:Title>Population in the United States</sld:Title>
    </sld:UserStyle>
  </sld:NamedLayer>
</sld:StyledLayerDescriptor>"#;

pub const POLYGON_STYLE: &str = r#"<style>
  <name>polygon</name>
  <format>sld</format>
  <filename>default_polygon.sld</filename>
</style>"#;

pub const POPHATCH_STYLE: &str = r#"<style>
  <name>pophatch</name>
  <workspace>
    <name>topp</name>
  </workspace>
  <format>sld</format>
  <filename>pophatch.sld</filename>
</style>"#;

pub const TASMANIA_GROUP: &str = r#"<layerGroup>
  <name>tasmania</name>
  <mode>SINGLE</mode>
  <title>Tasmania</title>
  <publishables>
    <published type="layer">
      <name>topp:states</name>
    </published>
    <published type="layer">
      <name>sf:sfdem</name>
    </published>
  </publishables>
  <styles>
    <style>
      <name>population</name>
    </style>
    <style/>
  </styles>
  <bounds>
    <minx>-124.731422</minx>
    <maxx>-66.969849</maxx>
    <miny>24.955967</miny>
    <maxy>49.371735</maxy>
    <crs>EPSG:4326</crs>
  </bounds>
</layerGroup>"#;

pub const GLOBAL_SETTINGS: &str = r#"<global>
  <settings>
    <id>SettingsInfoImpl--53f5d5b2:1494e7a5fc4:-8000</id>
    <contact>
      <addressCity>Alexandria</addressCity>
      <addressCountry>Egypt</addressCountry>
      <addressType>Work</addressType>
      <contactEmail>claudius.ptolomaeus@gmail.com</contactEmail>
      <contactOrganization>The Ancient Geographers</contactOrganization>
      <contactPerson>Claudius Ptolomaeus</contactPerson>
      <contactPosition>Chief Geographer</contactPosition>
    </contact>
    <charset>UTF-8</charset>
    <numDecimals>8</numDecimals>
    <onlineResource>http://geoserver.org</onlineResource>
    <verbose>false</verbose>
    <verboseExceptions>false</verboseExceptions>
    <localWorkspaceIncludesPrefix>false</localWorkspaceIncludesPrefix>
  </settings>
  <jai>
    <allowInterpolation>false</allowInterpolation>
    <recycling>false</recycling>
    <tilePriority>5</tilePriority>
    <tileThreads>7</tileThreads>
    <memoryCapacity>0.5</memoryCapacity>
    <memoryThreshold>0.75</memoryThreshold>
    <imageIOCache>false</imageIOCache>
    <pngAcceleration>true</pngAcceleration>
    <jpegAcceleration>true</jpegAcceleration>
    <allowNativeMosaic>false</allowNativeMosaic>
    <allowNativeWarp>false</allowNativeWarp>
  </jai>
  <coverageAccess>
    <maxPoolSize>10</maxPoolSize>
    <corePoolSize>5</corePoolSize>
    <keepAliveTime>30000</keepAliveTime>
    <queueType>UNBOUNDED</queueType>
    <imageIOCacheThreshold>10240</imageIOCacheThreshold>
  </coverageAccess>
  <updateSequence>1203</updateSequence>
  <featureTypeCacheSize>0</featureTypeCacheSize>
  <globalServices>true</globalServices>
  <xmlPostRequestLogBufferSize>1024</xmlPostRequestLogBufferSize>
</global>"#;

pub const WMS_SETTINGS: &str = r#"<wms>
  <enabled>true</enabled>
  <name>WMS</name>
  <title>GeoServer Web Map Service</title>
  <maintainer>http://geoserver.org/comm</maintainer>
  <abstrct>A compliant implementation of WMS plus most of the SLD extension.</abstrct>
  <accessConstraints>NONE</accessConstraints>
  <fees>NONE</fees>
  <versions>
    <org.geotools.util.Version>
      <version>1.1.1</version>
    </org.geotools.util.Version>
    <org.geotools.util.Version>
      <version>1.3.0</version>
    </org.geotools.util.Version>
  </versions>
  <keywords>
    <string>WFS</string>
    <string>WMS</string>
    <string>GEOSERVER</string>
  </keywords>
  <citeCompliant>false</citeCompliant>
  <onlineResource>http://geoserver.org</onlineResource>
  <schemaBaseURL>http://schemas.opengis.net</schemaBaseURL>
  <verbose>false</verbose>
  <metadata>
    <entry key="svgAntiAlias">true</entry>
    <entry key="svgRenderer">Batik</entry>
  </metadata>
  <watermark>
    <enabled>false</enabled>
    <position>BOT_RIGHT</position>
    <transparency>100</transparency>
  </watermark>
  <interpolation>Nearest</interpolation>
  <getFeatureInfoMimeTypeCheckingEnabled>false</getFeatureInfoMimeTypeCheckingEnabled>
  <dynamicStylingDisabled>false</dynamicStylingDisabled>
  <maxBuffer>25</maxBuffer>
  <maxRequestMemory>0</maxRequestMemory>
  <maxRenderingTime>0</maxRenderingTime>
  <maxRenderingErrors>0</maxRenderingErrors>
</wms>"#;

pub const TOPP_WMS_SETTINGS: &str = r#"<wms>
  <workspace>
    <name>topp</name>
  </workspace>
  <enabled>true</enabled>
  <name>topp</name>
  <title>Topp maps</title>
</wms>"#;

pub const WFS_SETTINGS: &str = r#"<wfs>
  <enabled>true</enabled>
  <name>WFS</name>
  <title>GeoServer Web Feature Service</title>
  <versions>
    <org.geotools.util.Version>
      <version>1.0.0</version>
    </org.geotools.util.Version>
    <org.geotools.util.Version>
      <version>1.1.0</version>
    </org.geotools.util.Version>
    <org.geotools.util.Version>
      <version>2.0.0</version>
    </org.geotools.util.Version>
  </versions>
  <gml>
    <entry>
      <version>V_10</version>
      <gml>
        <srsNameStyle>XML</srsNameStyle>
        <overrideGMLAttributes>true</overrideGMLAttributes>
      </gml>
    </entry>
  </gml>
  <serviceLevel>COMPLETE</serviceLevel>
  <maxFeatures>1000000</maxFeatures>
  <featureBounding>true</featureBounding>
  <canonicalSchemaLocation>false</canonicalSchemaLocation>
  <encodeFeatureMember>false</encodeFeatureMember>
  <hitsIgnoreMaxFeatures>false</hitsIgnoreMaxFeatures>
</wfs>"#;

pub const ADMIN_USER: &str = r#"<user>
  <userName>admin</userName>
  <enabled>true</enabled>
</user>"#;

/// Load every fixture document into `server`.
pub fn seed(server: &FakeGeoServer) {
    server.add_workspace("topp", TOPP_URI);
    server.add_workspace("sf", SF_URI);
    server.set_default_workspace("topp");

    let documents = [
        ("about/version.xml", VERSION),
        ("workspaces/topp/datastores/states_shapefile.xml", STATES_STORE),
        (
            "workspaces/topp/datastores/states_shapefile/featuretypes/states.xml",
            STATES_FEATURE_TYPE,
        ),
        ("layers/topp:states.xml", STATES_LAYER),
        ("workspaces/sf/coveragestores/sfdem.xml", SFDEM_STORE),
        ("workspaces/sf/coveragestores/sfdem/coverages/sfdem.xml", SFDEM_COVERAGE),
        ("layers/sf:sfdem.xml", SFDEM_LAYER),
        ("styles/population.xml", POPULATION_STYLE),
        ("styles/population.sld", POPULATION_SLD),
        ("styles/polygon.xml", POLYGON_STYLE),
        ("workspaces/topp/styles/pophatch.xml", POPHATCH_STYLE),
        ("layergroups/tasmania.xml", TASMANIA_GROUP),
        ("settings", GLOBAL_SETTINGS),
        ("services/wms/settings", WMS_SETTINGS),
        ("services/wms/workspaces/topp/settings", TOPP_WMS_SETTINGS),
        ("services/wfs/settings", WFS_SETTINGS),
        ("security/usergroup/users/admin", ADMIN_USER),
    ];
    for (path, body) in documents {
        server.put_document(path, body);
    }

    server.grant_role("admin", "ADMIN");
    server.add_role("GROUP_ADMIN");
    server.set_master_password(MASTER_PASSWORD);
}

#[cfg(test)]
mod tests {
    use crate::config::*;
    use serde_json::json;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn page(template: &str, output: &str) -> PageConfig {
        PageConfig {
            template: template.to_string(),
            output: output.to_string(),
            api: None,
            method: HttpMethod::Get,
            params: serde_json::Map::new(),
            transform: None,
        }
    }

    #[test]
    fn test_serialization() {
        let config: SiteConfig = serde_json::from_value(json!({
            "pages": [
                { "template": "index.html", "output": "index.html", "api": "/api/home" },
                {
                    "template": "product.html",
                    "output": "product.html",
                    "api": "/api/products",
                    "method": "POST",
                    "params": { "page": 1 },
                    "transform": { "kind": "defaults", "values": { "products": [] } }
                }
            ],
            "api": { "baseUrl": "http://localhost:3001", "timeoutMs": 2000 },
            "paths": { "outputDir": "public" }
        }))
        .unwrap();

        assert_eq!(config.pages.len(), 2);
        assert_eq!(config.pages[1].method, HttpMethod::Post);
        assert_eq!(config.api.timeout_ms, 2000);
        assert_eq!(config.paths.output_dir, std::path::PathBuf::from("public"));
        assert_eq!(
            config.paths.template_dir,
            std::path::PathBuf::from("templates")
        );
        assert!(matches!(
            config.pages[1].transform,
            Some(TransformSpec::Defaults { .. })
        ));

        // camelCase field names
        let json_val = serde_json::to_value(&config).unwrap();
        assert!(json_val["paths"].get("outputDir").is_some());
        assert!(json_val["paths"].get("output_dir").is_none());
        assert_eq!(json_val["pages"][1]["method"], "POST");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result: Result<SiteConfig, _> = serde_json::from_value(json!({
            "pages": [],
            "templates": []
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        // No pages
        assert!(SiteConfig::default_config().validate().is_err());

        // Duplicate output
        let config = SiteConfig {
            pages: vec![page("a.html", "index.html"), page("b.html", "index.html")],
            ..SiteConfig::default_config()
        };
        assert!(config.validate().is_err());

        // Escaping output path
        let config = SiteConfig {
            pages: vec![page("a.html", "../outside.html")],
            ..SiteConfig::default_config()
        };
        assert!(config.validate().is_err());

        // Endpoint without base URL
        let mut with_api = page("a.html", "a.html");
        with_api.api = Some("/api/a".to_string());
        let config = SiteConfig {
            pages: vec![with_api.clone()],
            ..SiteConfig::default_config()
        };
        assert!(config.validate().is_err());

        let mut config = SiteConfig {
            pages: vec![with_api, page("b.html", "nested/b.html")],
            ..SiteConfig::default_config()
        };
        config.api.base_url = Some("http://localhost:3001".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_transform_defaults_fill_missing_keys() {
        let spec = TransformSpec::Defaults {
            values: [("products".to_string(), json!([]))].into_iter().collect(),
        };
        let out = spec.apply(json!({ "title": "Shop", "products": null })).unwrap();
        assert_eq!(out, json!({ "title": "Shop", "products": [] }));

        let out = spec.apply(json!({ "products": [1] })).unwrap();
        assert_eq!(out, json!({ "products": [1] }));

        assert!(spec.apply(json!([1, 2])).is_err());
    }

    #[test]
    fn test_transform_pointer_and_wrap() {
        let pointer = TransformSpec::Pointer {
            path: "/data".to_string(),
        };
        assert_eq!(
            pointer.apply(json!({ "data": { "a": 1 } })).unwrap(),
            json!({ "a": 1 })
        );
        assert!(pointer.apply(json!({})).is_err());

        let wrap = TransformSpec::Wrap {
            key: "items".to_string(),
        };
        assert_eq!(wrap.apply(json!([1])).unwrap(), json!({ "items": [1] }));
    }

    #[test]
    #[serial]
    fn test_load_json_file_resolves_paths() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("siteweave.config.json"),
            r#"{ "pages": [{ "template": "index.html", "output": "index.html" }] }"#,
        )
        .unwrap();

        let (config, file) =
            SiteConfig::load(&ConfigOverrides::default(), None, temp.path()).unwrap();

        assert_eq!(file, Some(temp.path().join("siteweave.config.json")));
        assert_eq!(config.pages.len(), 1);
        assert_eq!(config.paths.output_dir, temp.path().join("dist"));
        assert_eq!(config.paths.template_dir, temp.path().join("templates"));
    }

    #[test]
    #[serial]
    fn test_load_toml_file_with_overrides() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("site.toml");
        fs::write(
            &path,
            r#"
[[pages]]
template = "index.html"
output = "index.html"

[dev]
port = 4000
"#,
        )
        .unwrap();

        let overrides = ConfigOverrides {
            port: Some(5000),
            output_dir: None,
        };
        let (config, _) = SiteConfig::load(&overrides, Some(&path), temp.path()).unwrap();
        assert_eq!(config.dev.port, 5000);
        assert_eq!(config.dev.debounce_ms, default_debounce_ms());
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("siteweave.config.json"),
            r#"{ "pages": [{ "template": "a.html", "output": "a.html" }], "dev": { "port": 4000 } }"#,
        )
        .unwrap();

        std::env::set_var("SITEWEAVE_DEV__PORT", "4100");
        let result = SiteConfig::load(&ConfigOverrides::default(), None, temp.path());
        std::env::remove_var("SITEWEAVE_DEV__PORT");

        let (config, _) = result.unwrap();
        assert_eq!(config.dev.port, 4100);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.json");
        let result = SiteConfig::load(&ConfigOverrides::default(), Some(&missing), temp.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_descriptors_keep_order_and_transform() {
        let mut second = page("b.html", "b.html");
        second.transform = Some(TransformSpec::Wrap {
            key: "x".to_string(),
        });
        let config = SiteConfig {
            pages: vec![page("a.html", "a.html"), second],
            ..SiteConfig::default_config()
        };

        let descriptors = config.descriptors();
        assert_eq!(descriptors[0].template, "a.html");
        assert!(descriptors[0].transform.is_none());
        let transform = descriptors[1].transform.as_ref().unwrap();
        assert_eq!(transform.apply(json!(1)).unwrap(), json!({ "x": 1 }));
    }

    #[test]
    fn test_example_config_parses() {
        let example = SiteConfig::example_config();
        let config: SiteConfig = serde_json::from_str(&example).unwrap();
        assert!(config.validate().is_ok());
    }
}

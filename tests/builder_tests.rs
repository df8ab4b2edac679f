use std::fs;

use proxysub::generator::profile::{TEST_URL, WEST_COWBOY_GROUP_NAME};
use proxysub::interfaces::builder::{
    build_and_write_yaml, build_config, build_config_from_doc, BuildOptions,
};
use proxysub::parser::parse_subs_config;
use proxysub::utils::yaml::{parse_str, serialize};
use proxysub::{Document, Mapping, ProxySubError};

#[cfg(test)]
mod builder_tests {
    use super::*;

    fn build(template: &str, subs: &str) -> Mapping {
        let subs = parse_subs_config(&parse_str(subs).unwrap()).unwrap();
        build_config(parse_str(template).unwrap(), &subs, &BuildOptions::default())
            .unwrap()
            .as_mapping()
            .unwrap()
            .clone()
    }

    fn group<'a>(config: &'a Mapping, name: &str) -> &'a Mapping {
        config
            .get("proxy-groups")
            .and_then(Document::as_sequence)
            .unwrap()
            .iter()
            .filter_map(Document::as_mapping)
            .find(|g| g.get("name").and_then(Document::as_str) == Some(name))
            .unwrap_or_else(|| panic!("group {} missing", name))
    }

    fn strings(value: Option<&Document>) -> Vec<&str> {
        value
            .and_then(Document::as_sequence)
            .unwrap()
            .iter()
            .filter_map(Document::as_str)
            .collect()
    }

    #[test]
    fn test_exit_group_created_from_manual_proxies() {
        let config = build(
            r#"
proxy-groups:
  - name: Exit
    use: []
  - name: Select
    proxies: []
"#,
            r#"
proxies:
  - name: Home
  - name: US-node-1
"#,
        );

        let exit = group(&config, WEST_COWBOY_GROUP_NAME);
        assert_eq!(exit.get("type").and_then(Document::as_str), Some("url-test"));
        assert_eq!(strings(exit.get("proxies")), vec!["US-node-1"]);
        assert_eq!(exit.get("expected-status"), Some(&Document::Integer(407)));
        assert_eq!(exit.get("url").and_then(Document::as_str), Some(TEST_URL));
        assert!(!exit.contains_key("use"));

        // A group that only pulls from providers keeps its shape.
        let declared = group(&config, "Exit");
        assert!(strings(declared.get("use")).is_empty());
        assert!(!declared.contains_key("proxies"));

        let select = group(&config, "Select");
        assert_eq!(strings(select.get("proxies")), vec!["Home"]);
    }

    #[test]
    fn test_named_providers_replace_exit_members() {
        let config = build(
            r#"
proxy-groups:
  - name: 西部牛仔
    type: select
    proxies: [old]
    filter: 美国|US
    use: []
"#,
            r#"
proxy-providers:
  P1: http://example/a
  P2: http://example/b
proxies:
  - name: Home
"#,
        );

        let exit = group(&config, WEST_COWBOY_GROUP_NAME);
        assert_eq!(strings(exit.get("use")), vec!["P1", "P2"]);
        assert!(!exit.contains_key("proxies"));
        assert!(!exit.contains_key("filter"));

        let providers = config.get("proxy-providers").and_then(Document::as_mapping).unwrap();
        let names: Vec<&str> = providers.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["P1", "P2"]);
        let p2 = providers.get("P2").and_then(Document::as_mapping).unwrap();
        assert_eq!(p2.get("path").and_then(Document::as_str), Some("./providers/sub2.yaml"));
    }

    #[test]
    fn test_duplicate_provider_names_collapse() {
        let config = build(
            r#"
proxy-groups:
  - name: Select
    type: select
    proxies: [DIRECT]
    use: []
"#,
            r#"
proxy-providers:
  P1: http://example/a
  ' P1 ': http://example/b
proxies:
  - name: Home
"#,
        );

        assert_eq!(strings(group(&config, "Select").get("use")), vec!["P1"]);
        let providers = config.get("proxy-providers").and_then(Document::as_mapping).unwrap();
        assert_eq!(providers.len(), 1);
        let p1 = providers.get("P1").and_then(Document::as_mapping).unwrap();
        assert_eq!(p1.get("url").and_then(Document::as_str), Some("http://example/b"));
        assert_eq!(p1.get("path").and_then(Document::as_str), Some("./providers/sub1.yaml"));
    }

    #[test]
    fn test_merge_key_groups_are_rewritten() {
        let config = build(
            r#"
base: &base
  type: select
  proxies: [DIRECT]
  use: [old]
proxy-groups:
  - <<: *base
    name: G
"#,
            r#"
proxy-providers:
  P1: http://example/a
proxies:
  - name: Home
"#,
        );

        let g = group(&config, "G");
        assert!(!g.contains_key("<<"));
        assert_eq!(strings(g.get("use")), vec!["P1"]);
        assert_eq!(strings(g.get("proxies")), vec!["DIRECT", "Home"]);
    }

    #[test]
    fn test_positional_providers_follow_template_names() {
        let config = build(
            r#"
proxy-providers:
  Airport:
    type: http
    interval: 7200
    path: ./providers/airport.yaml
proxy-groups:
  - name: Auto
    type: url-test
    use: [Airport]
"#,
            r#"
subs:
  - http://example/one
  - http://example/two
proxies:
  - name: Home
"#,
        );

        let auto = group(&config, "Auto");
        assert_eq!(strings(auto.get("use")), vec!["Airport", "订阅2"]);

        let providers = config.get("proxy-providers").and_then(Document::as_mapping).unwrap();
        let airport = providers.get("Airport").and_then(Document::as_mapping).unwrap();
        assert_eq!(airport.get("url").and_then(Document::as_str), Some("http://example/one"));
        assert_eq!(airport.get("path").and_then(Document::as_str), Some("./providers/airport.yaml"));
        let second = providers.get("订阅2").and_then(Document::as_mapping).unwrap();
        assert_eq!(second.get("interval"), Some(&Document::Integer(7200)));
        assert_eq!(second.get("path").and_then(Document::as_str), Some("./providers/sub2.yaml"));
    }

    #[test]
    fn test_duplicate_proxies_keep_first() {
        let config = build(
            "proxy-groups: []\n",
            r#"
proxies:
  - {name: Home, server: 192.0.2.1, port: 8080}
  - {name: ' Home ', server: 192.0.2.2}
  - {name: ''}
  - {name: US-1}
"#,
        );
        let proxies = config.get("proxies").and_then(Document::as_sequence).unwrap();
        assert_eq!(proxies.len(), 2);
        let home = proxies.items[0].as_mapping().unwrap();
        assert_eq!(home.get("server").and_then(Document::as_str), Some("192.0.2.1"));
        assert_eq!(
            home.get("dialer-proxy").and_then(Document::as_str),
            Some(WEST_COWBOY_GROUP_NAME)
        );

        let exit = group(&config, WEST_COWBOY_GROUP_NAME);
        assert_eq!(exit.get("url").and_then(Document::as_str), Some("http://192.0.2.1:8080/"));
    }

    #[test]
    fn test_build_and_write_renders_flow_lists() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.yaml");
        let subs = dir.path().join("subs.yaml");
        let output = dir.path().join("out").join("sub.yaml");
        fs::write(
            &template,
            r#"
mixed-port: 7890
proxy-groups:
  - name: Select
    type: select
    proxies: [DIRECT]
    use: []
rules:
  - MATCH,Select
"#,
        )
        .unwrap();
        fs::write(
            &subs,
            r#"
proxy-providers:
  P1: http://example/a
proxies:
  - name: Home
  - name: 美国 01
"#,
        )
        .unwrap();

        let result =
            build_and_write_yaml(&template, &subs, &output, &BuildOptions::default()).unwrap();
        assert_eq!(result.output_path, output);
        assert_eq!(result.subs_config.home_proxy_name().unwrap(), "Home");

        let text = fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("mixed-port: 7890\n"));
        assert!(text.contains("  proxies: [DIRECT, Home]\n"));
        assert!(text.contains("  use: [P1]\n"));
        assert!(text.contains("rules:\n- MATCH,Select\n"));

        let config = result.config.as_mapping().unwrap();
        let exit = group(config, WEST_COWBOY_GROUP_NAME);
        assert_eq!(strings(exit.get("proxies")), vec!["美国 01"]);
        assert_eq!(strings(exit.get("use")), vec!["P1"]);
        assert!(text.contains("  proxies: [美国 01]\n"));

        let reread = parse_str(&text).unwrap();
        let root = reread.as_mapping().unwrap();
        let keys: Vec<&str> = root.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["mixed-port", "proxy-groups", "rules", "proxies", "proxy-providers"]
        );
    }

    #[test]
    fn test_failures_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.yaml");
        fs::write(&template, "- not\n- a mapping\n").unwrap();
        let subs = parse_str("proxies: [{name: Home}]\n").unwrap();

        let err = build_config_from_doc(&template, &subs, &BuildOptions::default()).unwrap_err();
        assert!(matches!(err, ProxySubError::Schema(_)));

        let missing = dir.path().join("missing.yaml");
        let err = build_config_from_doc(&missing, &subs, &BuildOptions::default()).unwrap_err();
        assert!(matches!(err, ProxySubError::Io(_)));
        assert!(!err.is_client_error());

        fs::write(&template, "proxy-groups: []\n").unwrap();
        let output = dir.path().join("never.yaml");
        let subs_path = dir.path().join("subs.yaml");
        fs::write(&subs_path, "proxies: [{name: Home}\n").unwrap();
        let err = build_and_write_yaml(&template, &subs_path, &output, &BuildOptions::default())
            .unwrap_err();
        assert!(matches!(err, ProxySubError::Format(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_round_trip_keeps_order_and_scalars() {
        let source = r#"port: 7890
allow-lan: false
ratio: 1.5
empty: null
name: 'yes'
number-like: '007'
nested:
  z: 1
  a:
  - x
  - y: 2
list: []
map: {}
"#;
        let doc = parse_str(source).unwrap();
        let text = serialize(&doc);
        assert_eq!(parse_str(&text).unwrap(), doc);

        let keys: Vec<&str> = doc.as_mapping().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["port", "allow-lan", "ratio", "empty", "name", "number-like", "nested", "list", "map"]
        );
        let root = doc.as_mapping().unwrap();
        assert_eq!(root.get("name").and_then(Document::as_str), Some("yes"));
        assert_eq!(root.get("number-like").and_then(Document::as_str), Some("007"));
    }
}

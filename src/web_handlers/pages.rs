use log::error;
use minijinja::{context, Environment, Error as JinjaError};
use once_cell::sync::Lazy;

const LAYOUT: &str = r#"<!doctype html>
<html lang="zh-CN">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{{ title }}</title>
  <style>
    body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, 'Noto Sans', 'PingFang SC', 'Microsoft YaHei', sans-serif; margin: 2rem; }
    .card { max-width: 860px; padding: 1.25rem 1.5rem; border: 1px solid #e5e7eb; border-radius: 12px; }
    code { background: #f3f4f6; padding: 0.12rem 0.35rem; border-radius: 6px; }
    pre { background: #f3f4f6; padding: 0.9rem 1rem; border-radius: 12px; overflow-x: auto; }
    pre code { background: transparent; padding: 0; }
    a { color: #2563eb; }
    .muted { color: #6b7280; }
  </style>
</head>
<body>
  <div class="card">
  {% block body %}{% endblock %}
  </div>
</body>
</html>
"#;

const INDEX: &str = r#"{% extends "layout.html" %}
{% block body %}<h2>proxysub</h2>
<p>上传 <code>subs.yaml</code>，生成一次性下载的订阅文件。</p>
<form action="/upload" method="post" enctype="multipart/form-data">
  <input type="file" name="file" accept=".yaml,.yml,text/yaml" required />
  <button type="submit">生成</button>
</form>
<p class="muted">服务器默认配置：<a href="/sub.yaml">/sub.yaml</a></p>{% endblock %}
"#;

const SUCCESS: &str = r#"{% extends "layout.html" %}
{% block body %}<h2>生成成功</h2>
<p>一次性下载链接（复制粘贴）：</p>
<pre><code>{{ download_url }}</code></pre>
<p><a href="{{ download_url }}">点击下载</a></p>
<p class="muted">链接有效期 {{ ttl_minutes }} 分钟；下载一次后即失效。</p>
<p><a href="/">返回继续上传</a></p>{% endblock %}
"#;

const ERROR: &str = r#"{% extends "layout.html" %}
{% block body %}<h2>生成失败</h2><pre><code>{{ message }}</code></pre><p><a href="/">返回</a></p>{% endblock %}
"#;

/// Page templates; `.html` names are auto-escaped.
static PAGE_ENV: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    for (name, source) in [
        ("layout.html", LAYOUT),
        ("index.html", INDEX),
        ("success.html", SUCCESS),
        ("error.html", ERROR),
    ] {
        if let Err(e) = env.add_template(name, source) {
            error!("Failed to load page template {}: {}", name, e);
        }
    }
    env
});

/// Whole minutes shown for a link lifetime, at least one.
pub fn ttl_minutes(ttl_secs: u64) -> u64 {
    (ttl_secs / 60).max(1)
}

pub fn render_index() -> Result<String, JinjaError> {
    PAGE_ENV
        .get_template("index.html")?
        .render(context! { title => "proxysub" })
}

pub fn render_success(download_url: &str, ttl_secs: u64) -> Result<String, JinjaError> {
    PAGE_ENV.get_template("success.html")?.render(context! {
        title => "生成成功",
        download_url => download_url,
        ttl_minutes => ttl_minutes(ttl_secs),
    })
}

pub fn render_error(message: &str) -> Result<String, JinjaError> {
    PAGE_ENV.get_template("error.html")?.render(context! {
        title => "生成失败",
        message => message,
    })
}

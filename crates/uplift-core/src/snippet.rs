//! Loader snippet generation.
//!
//! The snippet is the HTML/JS fragment host pages embed to pull the
//! published bundle at runtime. Its browser-side logic is carried as one
//! opaque template constant with `{{token}}` substitution from a typed
//! parameter struct; this module never assembles JS out of scattered
//! string concatenation.
//!
//! The literal `%WIDGET%` placeholder is part of the output: the host
//! CMS substitutes it when the snippet is pasted in.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uplift_config::TemplateConfig;
use uplift_types::{Target, VersionContext};

/// File the rendered snippet is written to, in the project directory.
pub const SNIPPET_FILE: &str = "template-code.html";

/// Development loopback URL for the script-loader bootstrap, selected
/// in the browser by the `scriptLoaderDev=1` query flag.
const DEV_LOADER_URL: &str = "https://ss-script-loader.shortstack.local/main.js";

const TEMPLATE: &str = r#"{{misc_script}}
{{before_scripts}}
<script type='text/javascript'>
  function loadScript(url, env) {return new Promise(function(resolve, reject) {var script = document.createElement('script'); document.body.appendChild(script); if (env === 'development') script.type = 'module'; script.onload = resolve; script.onerror = reject; script.async = false; script.src = url;});}
  campaign.on('campaign-loaded', function() {
    campaign.disableAutoLock()
    var getQueryParams = function() {
      return new Promise(function(resolve, reject) {
        if (campaign.app().mode !== 'live') {
          window.SSTEMPLATE.getBuilderQueryParams().then((queryParams) => {
            resolve(queryParams)
          })
        } else {
          resolve(campaign.queryParamsGet())
        }
      })
    }
    getQueryParams().then(queryParams => {
      var isDev = queryParams.dev && queryParams.dev === '1'
      var scriptLoaderDev = queryParams.scriptLoaderDev && queryParams.scriptLoaderDev === '1'
      var url = scriptLoaderDev ? '{{dev_loader_url}}' : '{{loader_url}}'
      var env = isDev ? 'development' : 'production'
      loadScript(url, env).then(function() {
        try {
          window.ssTL({
            name: '{{name}}',
            campaign: window.campaign,
            css: {{css}},
            env: env,
            assetsLoadedCallback: function() {
              {{after_campaign_loaded}}
            },
            appVersion: '{{app_version}}',
            wizardVersion: '{{wizard_version}}',
            scriptVersion: '{{script_version}}',
            server: '{{server}}',
          })
          window.SSTManager.loadAssets()
        } catch(e) {
          console.log('script-loader error:', e)
        }
      })
    })
  }, { widget: '%WIDGET%', synchronous: true })
</script>
"#;

/// Everything the template needs, resolved up front.
#[derive(Debug, Clone)]
pub struct SnippetParams {
    pub name: String,
    pub server: String,
    pub css: bool,
    pub app_version: String,
    /// Effective version iff the config has a `wizardVersion` key, else empty.
    pub wizard_version: String,
    pub script_version: String,
    /// Misc `<script>` tag source, present iff the config has `miscVersion`.
    pub misc_src: Option<String>,
    pub before_scripts: String,
    pub after_campaign_loaded: String,
    /// Production URL of the shared script-loader bootstrap.
    pub loader_url: String,
}

impl SnippetParams {
    pub fn build(config: &TemplateConfig, ctx: &VersionContext, target: &Target) -> Self {
        let version = &ctx.effective_version;

        Self {
            name: config.name.clone(),
            server: config.server_name().to_string(),
            css: config.css,
            app_version: version.clone(),
            wizard_version: if config.has_wizard() {
                version.clone()
            } else {
                String::new()
            },
            script_version: config.script_version.clone().unwrap_or_default(),
            misc_src: config.has_misc().then(|| {
                format!(
                    "{}/scripts/{}-misc/{}.js",
                    target.cdn_url, config.name, version
                )
            }),
            before_scripts: config.before_scripts.clone().unwrap_or_default(),
            after_campaign_loaded: config.after_campaign_loaded.clone().unwrap_or_default(),
            loader_url: format!(
                "{}/scripts/ss-script-loader/{}.js",
                target.cdn_url,
                config.script_loader_version.clone().unwrap_or_default()
            ),
        }
    }
}

/// Render the loader snippet.
pub fn render(params: &SnippetParams) -> String {
    let misc_script = params
        .misc_src
        .as_deref()
        .map(|src| format!("<script src=\"{src}\" type='text/javascript'></script>"))
        .unwrap_or_default();

    TEMPLATE
        .replace("{{misc_script}}", &misc_script)
        .replace("{{before_scripts}}", &params.before_scripts)
        .replace("{{dev_loader_url}}", DEV_LOADER_URL)
        .replace("{{loader_url}}", &params.loader_url)
        .replace("{{name}}", &params.name)
        .replace("{{css}}", if params.css { "true" } else { "false" })
        .replace("{{after_campaign_loaded}}", &params.after_campaign_loaded)
        .replace("{{app_version}}", &params.app_version)
        .replace("{{wizard_version}}", &params.wizard_version)
        .replace("{{script_version}}", &params.script_version)
        .replace("{{server}}", &params.server)
}

/// Write the rendered snippet into the project directory.
pub fn write_snippet(project_dir: &Path, content: &str) -> Result<PathBuf> {
    let path = project_dir.join(SNIPPET_FILE);
    fs::write(&path, content)
        .with_context(|| format!("failed to write snippet file {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> TemplateConfig {
        TemplateConfig {
            name: "wheel".into(),
            css: true,
            app_version: Some("v1".into()),
            script_version: Some("app".into()),
            script_loader_version: Some("7".into()),
            ..Default::default()
        }
    }

    fn sample_ctx() -> VersionContext {
        VersionContext {
            effective_version: "v1".into(),
            source_branch: "main".into(),
            timestamp: "20260826-101500".into(),
            is_default_publish: true,
        }
    }

    #[test]
    fn renders_without_leftover_tokens() {
        let params = SnippetParams::build(&sample_config(), &sample_ctx(), &Target::default());
        let out = render(&params);
        assert!(!out.contains("{{"), "unsubstituted token in:\n{out}");
    }

    #[test]
    fn misc_tag_present_iff_misc_version() {
        let target = Target::default();
        let ctx = sample_ctx();

        let without = render(&SnippetParams::build(&sample_config(), &ctx, &target));
        assert!(!without.contains("-misc/"));

        let mut config = sample_config();
        config.misc_version = Some("v1".into());
        let with = render(&SnippetParams::build(&config, &ctx, &target));
        assert!(with.contains(&format!(
            "<script src=\"{}/scripts/wheel-misc/v1.js\" type='text/javascript'></script>",
            target.cdn_url
        )));
    }

    #[test]
    fn wizard_version_empty_unless_enabled() {
        let target = Target::default();
        let ctx = sample_ctx();

        let out = render(&SnippetParams::build(&sample_config(), &ctx, &target));
        assert!(out.contains("wizardVersion: '',"));

        let mut config = sample_config();
        config.wizard_version = Some("old".into());
        let out = render(&SnippetParams::build(&config, &ctx, &target));
        assert!(out.contains("wizardVersion: 'v1',"));
    }

    #[test]
    fn embeds_versions_and_server() {
        let params = SnippetParams::build(&sample_config(), &sample_ctx(), &Target::default());
        let out = render(&params);
        assert!(out.contains("appVersion: 'v1',"));
        assert!(out.contains("scriptVersion: 'app',"));
        assert!(out.contains("server: 'wheel',"));
        assert!(out.contains("css: true,"));
        assert!(out.contains("/scripts/ss-script-loader/7.js"));
    }

    #[test]
    fn keeps_cms_widget_placeholder() {
        let params = SnippetParams::build(&sample_config(), &sample_ctx(), &Target::default());
        assert!(render(&params).contains("widget: '%WIDGET%'"));
    }

    #[test]
    fn splices_callback_fragments() {
        let mut config = sample_config();
        config.before_scripts = Some("<script>init()</script>".into());
        config.after_campaign_loaded = Some("console.log('ready')".into());

        let out = render(&SnippetParams::build(&config, &sample_ctx(), &Target::default()));
        assert!(out.contains("<script>init()</script>"));
        assert!(out.contains("console.log('ready')"));
    }

    #[test]
    fn writes_snippet_file() {
        let td = tempfile::tempdir().expect("tempdir");
        let path = write_snippet(td.path(), "<script></script>").expect("write");
        assert_eq!(path, td.path().join(SNIPPET_FILE));
        assert!(path.exists());
    }
}

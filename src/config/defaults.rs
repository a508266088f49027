// src/config/defaults.rs

/// Pipeline used when the project has no `Assetpipe.toml`.
///
/// Sources live under `app/assets`, intermediate output (served during
/// development) under `.tmp`, and the production site under `public`.
/// `serve` reloads the browser for page and image edits through the
/// `pages` group, which has inputs but nothing to build.
pub const DEFAULT_PIPELINE: &str = r#"
[config]
targets = ["build"]

[serve]
roots = [".tmp", "app/assets"]
targets = ["styles", "scripts", "vendor", "fonts", "pages"]

[serve.mounts]
"/bower_components" = "bower_components"

[task.clean]
action = "clean"
paths = [".tmp", "public"]

[task.styles]
action = "styles"
inputs = ["app/assets/sass/**/*.scss"]
entries = ["app/assets/sass/*.scss"]
output = ".tmp/styles"
include_paths = ["."]

[task.scripts]
action = "scripts"
inputs = ["app/assets/js/**/*.js"]
output = ".tmp/scripts"
outfile = "main.js"

[task.lint]
action = "command"
inputs = ["app/assets/js/**/*.js"]
cmd = "jshint app/assets/js"

[task.vendor]
action = "vendor"
inputs = ["bower_components/*/dist/*.js", "!bower_components/*/dist/*.min.js"]
output = ".tmp/vendor"
outfile = "vendor.js"

[task.images]
action = "images"
inputs = ["app/assets/images/**/*"]
output = "public/img"

[task.fonts]
action = "copy"
inputs = ["app/assets/fonts/**/*"]
output = ".tmp/fonts"

[task.fonts-public]
action = "copy"
inputs = ["app/assets/fonts/**/*"]
output = "public/fonts"

[task.html]
action = "html"
inputs = ["app/assets/*.html"]
output = "public"
after = ["styles", "scripts", "vendor"]
search_paths = [".tmp", "app/assets", "."]
minify = true

[task.extras]
action = "copy"
inputs = ["app/assets/*.*", "!app/assets/*.html"]
output = "public"
after = ["html"]

[task.build]
action = "group"
after = ["html", "images", "fonts-public", "extras", "lint"]

[task.pages]
action = "group"
inputs = ["app/assets/*.html", "app/assets/images/**/*"]
"#;

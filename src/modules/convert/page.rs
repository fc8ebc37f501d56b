/// Server-rendered upload form.
///
/// The page puts a random `download_token` in the form and shows a spinner
/// until the response sets a cookie carrying the same token.
pub fn render_index(max_upload_bytes: usize, allowed_extensions: &[String], flash: Option<&str>) -> String {
    let accept = allowed_extensions
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",");

    let notice = match flash {
        Some(message) => format!("<p class=\"flash\">{}</p>", escape_html(message)),
        None => String::new(),
    };

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Video converter</title>
<style>
body {{ font-family: sans-serif; max-width: 36rem; margin: 3rem auto; }}
.flash {{ background: #fee; border: 1px solid #c66; padding: .5rem; }}
#spinner {{ display: none; }}
</style>
</head>
<body>
<h1>Convert a video to web-friendly MP4</h1>
{notice}
<form id="upload" method="post" action="/convert" enctype="multipart/form-data">
<input type="file" name="file" accept="{accept}" required>
<input type="hidden" name="download_token" id="download_token">
<button type="submit">Convert</button>
</form>
<p>Allowed: {allowed}. Maximum size: {max_size}.</p>
<p id="spinner">Converting, your download will start shortly&hellip;</p>
<script>
document.getElementById("upload").addEventListener("submit", function () {{
  var token = Date.now().toString(36) + Math.random().toString(36).slice(2);
  document.getElementById("download_token").value = token;
  document.getElementById("spinner").style.display = "block";
  var timer = setInterval(function () {{
    if (document.cookie.indexOf("download_token=" + token) !== -1) {{
      clearInterval(timer);
      document.getElementById("spinner").style.display = "none";
    }}
  }}, 1000);
}});
</script>
</body>
</html>
"#,
        notice = notice,
        accept = escape_html(&accept),
        allowed = escape_html(&allowed_extensions.join(", ")),
        max_size = human_size(max_upload_bytes),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn human_size(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

//! Embedded web pages
//!
//! The login and admin pages ship inside the binary, so the server has no
//! static file tree to manage. The admin page talks to the JSON API with
//! fetch and an Accept: application/json header, which is what routes 401
//! instead of redirecting when a session expires mid-use.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};

/// Serve the login page HTML
pub fn serve_login() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Full::new(Bytes::from(LOGIN_HTML)))
        .unwrap()
}

/// Serve the admin page HTML
pub fn serve_admin() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Full::new(Bytes::from(ADMIN_HTML)))
        .unwrap()
}

const LOGIN_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Appdock Login</title>
    <style>
        body { font-family: -apple-system, sans-serif; background: #1e1e2e; color: #cdd6f4;
               display: flex; align-items: center; justify-content: center; height: 100vh; margin: 0; }
        .card { background: #313244; padding: 2rem; border-radius: 8px; width: 20rem; }
        h1 { margin-top: 0; font-size: 1.3rem; }
        label { display: block; margin-top: 1rem; font-size: 0.85rem; }
        input { width: 100%; box-sizing: border-box; padding: 0.5rem; margin-top: 0.25rem;
                border: 1px solid #45475a; border-radius: 4px; background: #1e1e2e; color: inherit; }
        button { margin-top: 1.5rem; width: 100%; padding: 0.6rem; border: 0; border-radius: 4px;
                 background: #89b4fa; color: #1e1e2e; font-weight: 600; cursor: pointer; }
        .error { color: #f38ba8; margin-top: 1rem; font-size: 0.85rem; min-height: 1rem; }
    </style>
</head>
<body>
    <form class="card" id="login-form">
        <h1>Appdock</h1>
        <label>Username <input type="text" id="username" autocomplete="username" required></label>
        <label>Password <input type="password" id="password" autocomplete="current-password" required></label>
        <button type="submit">Sign in</button>
        <div class="error" id="error"></div>
    </form>
    <script>
        document.getElementById('login-form').addEventListener('submit', async (e) => {
            e.preventDefault();
            const resp = await fetch('/login', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json', 'Accept': 'application/json' },
                body: JSON.stringify({
                    username: document.getElementById('username').value,
                    password: document.getElementById('password').value,
                }),
            });
            if (resp.ok) {
                window.location.href = '/admin';
            } else {
                const body = await resp.json().catch(() => ({}));
                document.getElementById('error').textContent = body.error || 'Login failed';
            }
        });
    </script>
</body>
</html>
"##;

const ADMIN_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Appdock Admin</title>
    <style>
        body { font-family: -apple-system, sans-serif; background: #1e1e2e; color: #cdd6f4;
               margin: 0; padding: 2rem; }
        h1 { font-size: 1.4rem; }
        .toolbar { display: flex; justify-content: space-between; align-items: center; }
        table { width: 100%; border-collapse: collapse; margin-top: 1rem; }
        th, td { text-align: left; padding: 0.5rem 0.75rem; border-bottom: 1px solid #45475a; }
        tr.unhealthy td.status { color: #f38ba8; }
        tr.healthy td.status { color: #a6e3a1; }
        input { padding: 0.4rem; border: 1px solid #45475a; border-radius: 4px;
                background: #313244; color: inherit; }
        button { padding: 0.4rem 0.8rem; border: 0; border-radius: 4px; cursor: pointer;
                 background: #89b4fa; color: #1e1e2e; }
        button.danger { background: #f38ba8; }
        button.ghost { background: #45475a; color: #cdd6f4; }
        form.entry { display: flex; gap: 0.5rem; margin-top: 1.5rem; flex-wrap: wrap; }
    </style>
</head>
<body>
    <div class="toolbar">
        <h1 id="company">Appdock</h1>
        <button class="ghost" onclick="logout()">Log out</button>
    </div>

    <table>
        <thead>
            <tr><th>Title</th><th>URL</th><th>Health</th><th></th></tr>
        </thead>
        <tbody id="apps"></tbody>
    </table>

    <form class="entry" id="create-form">
        <input type="text" id="title" placeholder="Title" required>
        <input type="url" id="url" placeholder="https://app.example.com" required>
        <input type="text" id="image" placeholder="Icon URL (optional)">
        <input type="text" id="healthpath" placeholder="Health URL (optional)">
        <button type="submit">Add app</button>
    </form>

    <script>
        const JSON_HEADERS = { 'Content-Type': 'application/json', 'Accept': 'application/json' };

        async function api(path, options = {}) {
            const resp = await fetch(path, { headers: JSON_HEADERS, ...options });
            if (resp.status === 401) { window.location.href = '/login'; throw new Error('unauthorized'); }
            return resp;
        }

        async function loadCompany() {
            const resp = await fetch('/api/config');
            const cfg = await resp.json();
            document.getElementById('company').textContent = cfg.companyName;
        }

        async function loadApps() {
            const resp = await fetch('/api/apps');
            const apps = await resp.json();
            const tbody = document.getElementById('apps');
            tbody.innerHTML = '';
            for (const app of apps) {
                const tr = document.createElement('tr');
                tr.innerHTML = `
                    <td>${app.title}</td>
                    <td><a href="${app.url}">${app.url}</a></td>
                    <td class="status">&mdash;</td>
                    <td><button class="danger" data-id="${app.id}">Delete</button></td>`;
                tr.querySelector('button').addEventListener('click', () => removeApp(app.id));
                tbody.appendChild(tr);
                if (app.healthpath) checkHealth(tr, app.healthpath);
            }
        }

        async function checkHealth(row, target) {
            try {
                const resp = await fetch('/proxy-health?url=' + encodeURIComponent(target));
                row.className = resp.ok ? 'healthy' : 'unhealthy';
                row.querySelector('.status').textContent = resp.status;
            } catch {
                row.className = 'unhealthy';
                row.querySelector('.status').textContent = 'down';
            }
        }

        async function removeApp(id) {
            await api('/api/apps/' + id, { method: 'DELETE' });
            loadApps();
        }

        document.getElementById('create-form').addEventListener('submit', async (e) => {
            e.preventDefault();
            await api('/api/apps', {
                method: 'POST',
                body: JSON.stringify({
                    title: document.getElementById('title').value,
                    url: document.getElementById('url').value,
                    image: document.getElementById('image').value || null,
                    healthpath: document.getElementById('healthpath').value || null,
                }),
            });
            e.target.reset();
            loadApps();
        });

        function logout() {
            fetch('/logout', { headers: JSON_HEADERS }).then(() => window.location.href = '/login');
        }

        loadCompany();
        loadApps();
    </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_are_html() {
        let login = serve_login();
        assert_eq!(login.status(), StatusCode::OK);
        assert_eq!(
            login.headers().get(CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );

        let admin = serve_admin();
        assert_eq!(admin.status(), StatusCode::OK);
        assert!(ADMIN_HTML.contains("/api/apps"));
        assert!(LOGIN_HTML.contains("/login"));
    }
}

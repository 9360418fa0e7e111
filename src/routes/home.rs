use axum::response::Html;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Landing page HTML", content_type = "text/html")
    ),
    tag = "General"
)]
pub async fn root() -> Html<&'static str> {
    Html(r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <meta name="viewport" content="width=device-width, initial-scale=1.0">
            <title>Road Projects</title>
            <style>
                body {
                    display: flex;
                    flex-direction: column;
                    justify-content: center;
                    align-items: center;
                    height: 100vh;
                    margin: 0;
                    font-family: Arial, sans-serif;
                    background-color: #f4f1ea;
                }
                h1 {
                    color: #2d2d2d;
                }
                p {
                    color: #5a5a5a;
                }
                a {
                    margin-top: 20px;
                    padding: 10px 20px;
                    background-color: #e08e0b;
                    color: white;
                    text-decoration: none;
                    border-radius: 5px;
                    font-weight: bold;
                }
                a:hover {
                    background-color: #b8730a;
                }
            </style>
        </head>
        <body>
            <h1>Road Projects</h1>
            <p>Projects, road segments, site photos and status updates, with location search.</p>
            <a href="/swagger-ui/">Explore API Docs</a>
        </body>
        </html>
    "#)
}

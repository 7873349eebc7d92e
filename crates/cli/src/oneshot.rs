use crate::api_client::ApiClient;

pub async fn execute(client: &ApiClient, query: &str, user_id: Option<&str>) -> anyhow::Result<()> {
    let response = client.query(query, None, user_id).await?;
    println!("{}", response);
    Ok(())
}

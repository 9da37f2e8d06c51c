use anyhow::Result;
use console::style;

use crate::client::ReconClient;

pub async fn execute(client: &ReconClient) -> Result<()> {
    let agents = client.list_agents().await?;
    if agents.is_empty() {
        println!("{}", style("No agents available").dim());
    }
    for agent in agents {
        println!("{}", style(agent).bold().cyan());
    }
    Ok(())
}

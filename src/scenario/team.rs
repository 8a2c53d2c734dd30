//! Create-then-fetch traffic against the team API.

use anyhow::Result;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::{Scenario, Step, VuContext};
use crate::checks::Check;
use crate::domain::RequestDescriptor;

pub const CREATE_TAG: &str = "create_team";
pub const GET_TAG: &str = "get_team";
pub const CHECK_CREATED: &str = "team created";
pub const CHECK_RETRIEVED: &str = "team retrieved";

const MEMBER_NAMES: [&str; 3] = ["Alice", "Bob", "Charlie"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub team_name: String,
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

/// Each iteration creates a uniquely named three-member team
/// (`POST /team/add`, expects 201) and reads it back
/// (`GET /team/get?team_name=...`, expects 200).
#[derive(Debug, Clone, Default)]
pub struct TeamScenario;

impl TeamScenario {
    pub fn team_for(ctx: &VuContext) -> Team {
        let team_name = ctx.unique_name("team");
        let millis = ctx.started_at.timestamp_millis();
        let members = MEMBER_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| TeamMember {
                user_id: format!("user{}_{}", i + 1, team_name.trim_start_matches("team_")),
                username: format!("{name}_{millis}"),
                is_active: true,
            })
            .collect();
        Team { team_name, members }
    }
}

impl Scenario for TeamScenario {
    fn name(&self) -> &str {
        "team"
    }

    fn iteration(&self, ctx: &VuContext) -> Result<Vec<Step>> {
        let team = Self::team_for(ctx);

        let create = RequestDescriptor::post(ctx.env.url("/team/add"))
            .with_tag(CREATE_TAG)
            .with_json(&team)?;

        let get_url = Url::parse_with_params(
            &ctx.env.url("/team/get"),
            &[("team_name", team.team_name.as_str())],
        )?;
        let get = RequestDescriptor::get(get_url.as_str()).with_tag(GET_TAG);

        Ok(vec![
            Step::new(create).check(Check::status(CHECK_CREATED, 201)),
            Step::new(get).check(Check::status(CHECK_RETRIEVED, 200)),
        ])
    }
}

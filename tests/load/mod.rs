mod team_ramp;

// src/messages.rs
use poise::serenity_prelude::{
    self as serenity, ButtonStyle, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedAuthor,
    CreateInputText, CreateModal, InputTextStyle,
};

use crate::models::{
    CooldownRemaining, Region, TestType, TestingApplication, TierRank, FIELD_REGION, FIELD_SERVER,
    FIELD_TIER, FIELD_USERNAME,
};

/// Custom id prefix of the panel buttons, followed by the test type id
pub const PANEL_BUTTON_PREFIX: &str = "tier_testing:";
/// Custom id prefix of the application modal, followed by the test type id
pub const FORM_MODAL_PREFIX: &str = "tier_form:";

/// Added to every results post, in this order
pub const RESULT_REACTIONS: [&str; 6] = ["👑", "🥳", "😱", "😭", "😂", "💀"];

pub const NO_COOLDOWN: &str = "You have no active cooldown!";
pub const PERMISSION_DENIED: &str = "You don't have permission to use this command.";
pub const RESULTS_SUBMITTED: &str = "Results submitted successfully!";

pub fn cooldown_message(remaining: CooldownRemaining) -> String {
    format!(
        "You must wait {} before creating another ticket.",
        remaining
    )
}

pub fn ticket_created_message(channel_mention: &str) -> String {
    format!(
        "Ticket created successfully! Please check {}",
        channel_mention
    )
}

pub fn closing_message(delay_secs: u64) -> String {
    format!(
        "Test completed! This ticket will be closed in {} seconds.",
        delay_secs
    )
}

pub fn setup_panel_embed() -> CreateEmbed {
    CreateEmbed::new()
        .title("Crystal Tier List")
        .description(
            "Upon interacting, you will be asked to answer a form.\n\
            Once you have finished, a ticket will be created and await a Tester to respond.\n\
            If you are HT3 or higher, please use the HT3+ Testing button.\n\
            Once a tester has responded, your test will commence. Good Luck!\n\n\
            • Region should be the region of the server you wish to test on\n\
            • Username should be the name of the account you will be testing on",
        )
        .color(0x5865F2)
}

pub fn setup_panel_buttons() -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![
        CreateButton::new(format!("{}{}", PANEL_BUTTON_PREFIX, TestType::Evaluation.id()))
            .label("Evaluation Testing")
            .style(ButtonStyle::Primary),
        CreateButton::new(format!("{}{}", PANEL_BUTTON_PREFIX, TestType::Ht3Plus.id()))
            .label("HT3+ Testing")
            .style(ButtonStyle::Danger),
    ])]
}

fn form_input(label: &str, custom_id: &str, placeholder: &str) -> CreateActionRow {
    CreateActionRow::InputText(
        CreateInputText::new(InputTextStyle::Short, label, custom_id)
            .placeholder(placeholder)
            .required(true),
    )
}

pub fn application_form(test_type: TestType) -> CreateModal {
    CreateModal::new(
        format!("{}{}", FORM_MODAL_PREFIX, test_type.id()),
        "Testing Application",
    )
    .components(vec![
        form_input("Minecraft Username", FIELD_USERNAME, "Enter your Minecraft username"),
        form_input("Preferred Server", FIELD_SERVER, "Enter your preferred server"),
        form_input("Region", FIELD_REGION, "NA/EU/AS/ME"),
        form_input(test_type.tier_label(), FIELD_TIER, "Enter your tier"),
    ])
}

pub fn application_embed(application: &TestingApplication, applicant_mention: &str) -> CreateEmbed {
    let test_type = application.test_type;
    CreateEmbed::new()
        .title("New Testing Application")
        .description("A staff member will be with you shortly.")
        .color(0x00ff00)
        .field("Applicant", applicant_mention, false)
        .field("Minecraft Username", &application.minecraft_username, false)
        .field("Preferred Server", &application.preferred_server, false)
        .field("Region", &application.region, false)
        .field(test_type.tier_label(), &application.tier, false)
        .field("Test Type", test_type.display_name(), false)
}

/// Everything shown on a results post
pub struct ResultsSummary<'a> {
    pub player_name: &'a str,
    pub player_avatar_url: String,
    pub player_mention: String,
    pub tester_mention: String,
    pub region: Region,
    pub minecraft_username: &'a str,
    pub previous_rank: TierRank,
    pub new_rank: TierRank,
}

pub fn results_embed(summary: &ResultsSummary<'_>) -> CreateEmbed {
    CreateEmbed::new()
        .color(0xff0000)
        .author(
            CreateEmbedAuthor::new(format!("{}'s Test Results 🏆", summary.player_name))
                .icon_url(&summary.player_avatar_url),
        )
        .field("Tester", &summary.tester_mention, false)
        .field("Player", &summary.player_mention, false)
        .field("Region", summary.region.as_str(), false)
        .field("Minecraft Username", summary.minecraft_username, false)
        .field("Previous Rank", summary.previous_rank.as_str(), false)
        .field("Rank Earned", summary.new_rank.as_str(), false)
}

pub fn result_reactions() -> impl Iterator<Item = serenity::ReactionType> {
    RESULT_REACTIONS
        .iter()
        .map(|emoji| serenity::ReactionType::Unicode(emoji.to_string()))
}

use chrono::DateTime;
use chrono::Utc;
use reqwest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

pub async fn generate_openai_prompt(
    prompt: &str,
    prompt_type: &str,
    timezone: &str,
    api_key: &str,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let now: DateTime<Utc> = Utc::now();

    let full_prompt = match prompt_type {
        "calendar_action" => format!(
            "You are a calendar action extraction engine for a student planner.\n\
             Current date and time (UTC): {now}\n\
             User timezone: {tz}\n\
             Task: From the user message below, extract:\n\
             - \"action\": one of \"create\" or \"move\". Use \"move\" only when the user is rescheduling something that already exists.\n\
             - \"title\": the core activity with scheduling words removed. For example:\n\
               - \"add gym tomorrow at 6\" -> \"gym\"\n\
               - \"block two hours for the physics problem set on Sunday\" -> \"physics problem set\"\n\
             - \"start\" and \"end\": RFC3339 datetime strings in the user's timezone.\n\
             Rules:\n\
             - If the user gives an explicit date like \"December 6th\", use that exact month and day; do NOT change them.\n\
             - If the year is omitted, assume the next occurrence of that date on or after the current date.\n\
             - If the user gives a relative time (e.g. \"tomorrow at 6\", \"in two hours\"), compute the concrete datetime from the current date/time.\n\
             - For day-of-week phrases:\n\
               - \"Saturday\" or \"this Saturday\" means the next occurrence of that weekday on or after today.\n\
               - \"next Saturday\" means the occurrence in the following week (at least 7 days after today), not the immediate upcoming one.\n\
             - Bare hours like \"at 6\" mean the next upcoming 6 o'clock that falls in waking hours (06:00-23:00).\n\
             - If no duration or end time is given, make the block exactly one hour long.\n\
             - If the user includes corrections or clarifications (e.g. \"actually I meant Sunday\"), treat them as time corrections only and DO NOT include them in \"title\".\n\
             - Never invent or adjust the date away from what the user wrote; only add a year, time, or end if needed.\n\
             - Output ONLY raw JSON, no prose, markdown, or code fences.\n\
             - The JSON shape must be exactly:\n\
             {{\"action\":\"create|move\",\"title\":\"<string>\",\"start\":\"<RFC3339 datetime>\",\"end\":\"<RFC3339 datetime>\"}}\n\
             User message: \"{user_prompt}\"",
            now = now.to_rfc3339(),
            tz = timezone,
            user_prompt = prompt
        ),
        "calendar_correction" => format!(
            "You are a calendar action correction engine.\n\
             Current date and time (UTC): {now}\n\
             User timezone: {tz}\n\
             Task: Given the original scheduling request and a user-provided correction note, output a corrected calendar action.\n\
             Rules:\n\
             - The correction note is NOT activity content. It is only for fixing the date/time or clarifying intent.\n\
             - Preserve the original title unless the correction explicitly changes it.\n\
             - If the correction only adjusts time (e.g. \"actually I meant Sunday\"), update only the start and end.\n\
             - Keep the block the same length unless the correction changes the duration.\n\
             - Output ONLY raw JSON, no prose, markdown, or code fences.\n\
             - The JSON shape must be exactly:\n\
             {{\"action\":\"create|move\",\"title\":\"<string>\",\"start\":\"<RFC3339 datetime>\",\"end\":\"<RFC3339 datetime>\"}}\n\
             Original request: \"{user_prompt}\"",
            now = now.to_rfc3339(),
            tz = timezone,
            user_prompt = prompt
        ),
        "block_message" => format!(
            "You are a reminder message writer for a student planner.\n\
             Current date and time (UTC): {now}\n\
             Task: Given the structured block info below, write a short, natural English reminder to send to the student.\n\
             Rules:\n\
             - Address the student in second person (\"you\").\n\
             - Mention the block's start time explicitly.\n\
             - Include the block title naturally.\n\
             - If hours remaining is provided, include it in a friendly way.\n\
             - Keep it to 1-2 sentences, no markdown, no lists, no JSON.\n\
             - Do NOT wrap the output in quotes.\n\
             Structured input:\n\
             {structured}",
            now = now.to_rfc3339(),
            structured = prompt
        ),
        "intent_router" => format!(
            "You are an intent router for a scheduling assistant.\n\
             Current date and time (UTC): {now}\n\
             User timezone: {tz}\n\
             Task: Classify the user's message into one of these intents:\n\
             - schedule: requests to put an activity on the calendar at some time/date\n\
             - availability: questions about free time or open slots (\"when am I free on Thursday?\")\n\
             - unknown: unclear, or an activity with no time and no free-time question\n\
             Rules:\n\
             - If the message asks when something could happen rather than committing to a time, choose availability.\n\
             - If the message contains any explicit or implicit time/date for an activity (e.g., \"tomorrow\", \"next week\", weekdays, months, \"at 5pm\"), choose schedule.\n\
             Output ONLY raw JSON, no prose, markdown, or code fences.\n\
             The JSON shape must be exactly:\n\
             {{\"intent\":\"schedule|availability|unknown\",\"normalized_text\":\"<cleaned user text>\"}}\n\
             User message: \"{user_prompt}\"",
            now = now.to_rfc3339(),
            tz = timezone,
            user_prompt = prompt
        ),
        _ => return Err("Not a valid base prompt".to_string().into()),
    };

    query_openai(full_prompt, prompt_type, api_key).await
}

async fn query_openai(
    prompt: String,
    prompt_type: &str,
    api_key: &str,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let system_message = match prompt_type {
        "calendar_action" | "calendar_correction" => {
            "You are a strict JSON calendar action extraction engine. You read instructions and a user message and reply ONLY with a single JSON object, with no markdown, no backticks, and no extra text. If the user gives an explicit date (e.g. \"December 6th\"), you preserve that exact month and day and only fill in missing year/time/end according to the instructions."
        }
        "intent_router" => {
            "You are a strict JSON intent router. Reply ONLY with a single JSON object, with no markdown, no backticks, and no extra text."
        }
        "block_message" => {
            "You are a reminder message writer. Reply with plain text only (no JSON, no markdown, no quotes)."
        }
        _ => "You are a helpful assistant.",
    };

    let request: OpenAIRequest = OpenAIRequest {
        model: "gpt-4o-mini".to_string(),
        messages: vec![
            OpenAIMessage {
                role: "system".to_string(),
                content: system_message.to_string(),
            },
            OpenAIMessage {
                role: "user".to_string(),
                content: prompt,
            },
        ],
        max_tokens: 1500,
        temperature: 0.2,
    };

    let client = reqwest::Client::new();
    let response = client
        .post("https://api.openai.com/v1/chat/completions")
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        println!("Error {}: {}", status, text);
        return Err(format!("Request failed with status {}", status).into());
    }

    let parsed: OpenAIResponse = serde_json::from_str(&text)
        .map_err(|e| format!("Failed to parse JSON: {}\nRaw body: {}", e, text))?;

    if let Some(choice) = parsed.choices.first() {
        Ok(choice.message.content.clone())
    } else {
        println!("No choices found in response.\nRaw body:\n{}", text);
        Err("No response from OpenAI".to_string().into())
    }
}

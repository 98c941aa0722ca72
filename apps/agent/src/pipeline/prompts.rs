// Prompt templates for the title and keyword stages.
// The title template matches what the fine-tuned model was trained on;
// changing its wording changes the model's output format.

/// Marker after which the title model writes its answer.
pub const TITLE_MARKER: &str = "عنوان شغل:";

pub const TITLE_PROMPT_TEMPLATE: &str = "\
درخواست: بر اساس برچسب‌ها و مهارت‌ها، عنوان شغل مناسب را پیشنهاد دهید.
برچسب‌ها: {tags}
مهارت‌ها: {skills}
عنوان شغل:";

/// Asks for at most two specific Persian words suited to the Iranian job
/// market, answer only.
pub const KEYWORD_PROMPT_TEMPLATE: &str = "\
بر اساس این اطلاعات یک کلمه کلیدی مناسب برای جستجوی شغل در سایت jobinja.ir تولید کن:
عنوان شغل: {title}
برچسب‌ها: {tags}
مهارت‌ها: {skills}

کلمه کلیدی باید:
- حداکثر دو کلمه باشد
- به زبان فارسی باشد
- خاص و دقیق باشد
- مناسب بازار کار ایران باشد

فقط خود کلمه کلیدی را بدون توضیح برگردان.";

/// Substitutes `{name}` placeholders in one pass over the template.
/// Inserted values are never re-scanned, so user text that happens to
/// contain `{skills}` stays literal.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let hit = values.iter().find_map(|(name, value)| {
            tail.strip_prefix('{')
                .and_then(|t| t.strip_prefix(name))
                .and_then(|t| t.strip_prefix('}'))
                .map(|after| (*value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

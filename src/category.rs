/// Upstream category id for General Knowledge, the default selection
pub const GENERAL_KNOWLEDGE: u32 = 9;

/// Display names and upstream ids of the selectable categories
pub const CATEGORIES: [(&str, u32); 20] = [
    ("General Knowledge", 9),
    ("Books", 10),
    ("Film", 11),
    ("Music", 12),
    ("Television", 14),
    ("Video Games", 15),
    ("Science & Nature", 17),
    ("Computers", 18),
    ("Mathematics", 19),
    ("Sports", 21),
    ("Geography", 22),
    ("History", 23),
    ("Politics", 24),
    ("Art", 25),
    ("Animals", 27),
    ("Vehicles", 28),
    ("Comics", 29),
    ("Gadgets", 30),
    ("Anime & Manga", 31),
    ("Cartoon & Animations", 32),
];

pub fn name_of(id: u32) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|(_, cid)| *cid == id)
        .map(|(name, _)| *name)
}

pub fn id_of(name: &str) -> Option<u32> {
    let name = name.trim();
    CATEGORIES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, id)| *id)
}

/// Position of `id` in [`CATEGORIES`], used by selectors
pub fn index_of(id: u32) -> Option<usize> {
    CATEGORIES.iter().position(|(_, cid)| *cid == id)
}

/// Accepts either a category name or its numeric id
pub fn parse(value: &str) -> Result<u32, String> {
    if let Ok(id) = value.trim().parse::<u32>() {
        return name_of(id)
            .map(|_| id)
            .ok_or_else(|| format!("unknown category id {id}"));
    }
    id_of(value).ok_or_else(|| format!("unknown category '{value}'"))
}

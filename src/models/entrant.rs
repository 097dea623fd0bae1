use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// 允许的血型
static BLOOD_GROUPS: phf::Set<&'static str> = phf::phf_set! {
    "o+", "o-", "a+", "a-", "b+", "b-", "ab+", "ab-",
};

/// 性别（小写 -> 页面显示值）
static GENDERS: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "male" => "Male",
    "female" => "Female",
    "other" => "Other",
};

/// 证件类型（小写 -> 页面显示值）
static ID_PROOF_TYPES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "aadhaar" => "Aadhaar",
    "aadhar" => "Aadhaar",
    "pan" => "PAN",
    "driving license" => "Driving License",
    "voter id" => "Voter ID",
    "passport" => "Passport",
};

pub const DEFAULT_GENDER: &str = "Male";
pub const DEFAULT_ID_PROOF_TYPE: &str = "Aadhaar";
pub const DEFAULT_COUNTRY: &str = "India";

/// 一位报名成员
///
/// 在成员列表中的位置有含义：第 1 位是领队（总是填写完整地址），其余为普通成员。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entrant {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub dob: String,
    #[serde(deserialize_with = "lenient_string")]
    pub age: String,
    #[serde(alias = "blood group", deserialize_with = "lenient_string")]
    pub blood_group: String,
    #[serde(deserialize_with = "lenient_string")]
    pub gender: String,
    #[serde(alias = "id_proof", alias = "idtype", deserialize_with = "lenient_string")]
    pub id_proof_type: String,
    #[serde(
        alias = "aadhaar",
        alias = "aadhar",
        alias = "aadhar_no",
        alias = "id_no",
        deserialize_with = "lenient_string"
    )]
    pub id_number: String,
    #[serde(deserialize_with = "lenient_string")]
    pub mobile: String,
    #[serde(alias = "mail_id", deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "lenient_string")]
    pub country: String,
    #[serde(deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(deserialize_with = "lenient_string")]
    pub district: String,
    #[serde(deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(deserialize_with = "lenient_string")]
    pub street: String,
    #[serde(alias = "door_no", deserialize_with = "lenient_string")]
    pub doorno: String,
    #[serde(alias = "pin_code", deserialize_with = "lenient_string")]
    pub pincode: String,
    #[serde(
        alias = "nearest ttd temple",
        skip_serializing_if = "String::is_empty",
        deserialize_with = "lenient_string"
    )]
    pub nearest_ttd_temple: String,
    #[serde(alias = "photo_path", alias = "image", deserialize_with = "lenient_string")]
    pub photo: String,
}

impl Entrant {
    /// 规范化字段：去空白、证件号去掉分隔符、枚举值对齐页面选项
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.name,
            &mut self.dob,
            &mut self.age,
            &mut self.mobile,
            &mut self.email,
            &mut self.country,
            &mut self.state,
            &mut self.district,
            &mut self.city,
            &mut self.street,
            &mut self.doorno,
            &mut self.pincode,
            &mut self.nearest_ttd_temple,
            &mut self.photo,
        ] {
            *field = field.trim().to_string();
        }

        self.id_number = self
            .id_number
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect();

        let blood = self.blood_group.trim().to_lowercase();
        self.blood_group = if BLOOD_GROUPS.contains(blood.as_str()) {
            blood.to_uppercase()
        } else {
            String::new()
        };

        self.gender = GENDERS
            .get(self.gender.trim().to_lowercase().as_str())
            .copied()
            .unwrap_or(DEFAULT_GENDER)
            .to_string();

        self.id_proof_type = ID_PROOF_TYPES
            .get(self.id_proof_type.trim().to_lowercase().as_str())
            .copied()
            .unwrap_or(DEFAULT_ID_PROOF_TYPE)
            .to_string();

        self
    }

    /// 日志中使用的显示名
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "(未命名)"
        } else {
            &self.name
        }
    }

    /// 成员是否为空行（没有姓名）
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }
}

/// 接受字符串、数字、布尔或 null，统一转成字符串
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s,
        Some(JsonValue::Number(n)) => n.to_string(),
        Some(JsonValue::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aliases_and_numbers_are_accepted() {
        let entrant: Entrant = serde_json::from_value(json!({
            "name": "Rama Kumar",
            "aadhar_no": "1234-5678 9012",
            "mail_id": "rama@example.com",
            "door_no": "4-12",
            "pin_code": 517501,
            "age": 30,
            "blood group": "ab+",
            "photo_path": "1.jpg"
        }))
        .unwrap();

        let entrant = entrant.normalized();
        assert_eq!(entrant.id_number, "123456789012");
        assert_eq!(entrant.email, "rama@example.com");
        assert_eq!(entrant.doorno, "4-12");
        assert_eq!(entrant.pincode, "517501");
        assert_eq!(entrant.age, "30");
        assert_eq!(entrant.blood_group, "AB+");
        assert_eq!(entrant.photo, "1.jpg");
    }

    #[test]
    fn test_enum_fields_fall_back_to_defaults() {
        let entrant = Entrant {
            gender: "FEMALE".to_string(),
            id_proof_type: "unknown card".to_string(),
            blood_group: "Z+".to_string(),
            ..Entrant::default()
        }
        .normalized();

        assert_eq!(entrant.gender, "Female");
        assert_eq!(entrant.id_proof_type, DEFAULT_ID_PROOF_TYPE);
        assert!(entrant.blood_group.is_empty());

        let entrant = Entrant::default().normalized();
        assert_eq!(entrant.gender, DEFAULT_GENDER);
    }

    #[test]
    fn test_null_fields_become_empty() {
        let entrant: Entrant = serde_json::from_value(json!({
            "name": "Sita Devi",
            "email": null
        }))
        .unwrap();
        assert!(entrant.email.is_empty());
        assert!(!entrant.is_blank());
    }
}
